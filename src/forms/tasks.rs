use serde::Deserialize;

use crate::domain::types::UserId;
use crate::forms::{FormError, parse_field};

/// Body of `POST /api/v1/tasks/export-contacts/`; an empty body exports every
/// contact the caller can see.
#[derive(Debug, Default, Deserialize)]
pub struct ExportContactsForm {
    #[serde(default)]
    pub owner_id: Option<i32>,
}

impl ExportContactsForm {
    pub fn owner(&self) -> Result<Option<UserId>, FormError> {
        self.owner_id
            .map(|id| parse_field("owner_id", UserId::new(id)))
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_non_positive_owner() {
        let form = ExportContactsForm { owner_id: Some(0) };
        assert!(form.owner().is_err());
        assert_eq!(ExportContactsForm::default().owner().unwrap(), None);
    }
}
