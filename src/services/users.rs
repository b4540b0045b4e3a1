//! User directory, profile and account administration.

use crate::auth::{AuthenticatedUser, hash_password, verify_password};
use crate::domain::types::{EmailAddress, PersonName, UserId};
use crate::domain::user::{NewUser, UpdateUserProfile, User, UserRole};
use crate::dto::MessageResponse;
use crate::dto::users::{PermissionsResponse, UserResponse};
use crate::forms::auth::ChangePasswordForm;
use crate::forms::users::{UpdateProfileForm, UserListParams};
use crate::pagination::Paginated;
use crate::repository::{UserListQuery, UserReader, UserWriter};
use crate::services::auth::check_password_policy;
use crate::services::errors::ErrorDetail;
use crate::services::{ServiceError, ServiceResult, ensure_admin, ensure_can_view_all};

fn load_user<R>(repo: &R, id: UserId) -> ServiceResult<User>
where
    R: UserReader + ?Sized,
{
    repo.get_user_by_id(id)?
        .ok_or_else(|| ServiceError::not_found("User"))
}

fn ensure_self_or_staff(current: &AuthenticatedUser, id: UserId) -> ServiceResult<()> {
    if current.id == id {
        Ok(())
    } else {
        ensure_can_view_all(current)
    }
}

pub fn list_users<R>(
    repo: &R,
    current: &AuthenticatedUser,
    params: UserListParams,
) -> ServiceResult<Paginated<UserResponse>>
where
    R: UserReader + ?Sized,
{
    ensure_can_view_all(current)?;

    let paging = params.paging();
    let mut query = UserListQuery::new().paginate(paging.page(), paging.per_page());
    if let Some(term) = params.search.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
        query = query.search(term);
    }
    if let Some(role) = params.role()? {
        query = query.role(role);
    }
    if let Some(is_active) = params.is_active {
        query = query.is_active(is_active);
    }

    let (total, users) = repo.list_users(query)?;
    Ok(Paginated::new(users, paging.page(), paging.per_page(), total).map(UserResponse::from))
}

pub fn get_user<R>(repo: &R, current: &AuthenticatedUser, id: i32) -> ServiceResult<UserResponse>
where
    R: UserReader + ?Sized,
{
    let id = UserId::new(id)?;
    ensure_self_or_staff(current, id)?;
    Ok(load_user(repo, id)?.into())
}

pub fn current_user<R>(repo: &R, current: &AuthenticatedUser) -> ServiceResult<UserResponse>
where
    R: UserReader + ?Sized,
{
    Ok(load_user(repo, current.id)?.into())
}

pub fn update_current_user<R>(
    repo: &R,
    current: &AuthenticatedUser,
    form: UpdateProfileForm,
) -> ServiceResult<UserResponse>
where
    R: UserReader + UserWriter + ?Sized,
{
    let patch = UpdateUserProfile::try_from(form)?;
    let user = patch.apply(load_user(repo, current.id)?);
    let updated = repo.update_user_profile(&user)?;
    log::info!("User {} updated their profile", updated.id);
    Ok(updated.into())
}

pub fn change_password<R>(
    repo: &R,
    current: &AuthenticatedUser,
    id: i32,
    form: ChangePasswordForm,
) -> ServiceResult<MessageResponse>
where
    R: UserReader + UserWriter + ?Sized,
{
    let id = UserId::new(id)?;
    if current.id != id {
        return Err(ServiceError::Forbidden(
            "You can only change your own password.".into(),
        ));
    }
    form.check()?;

    let credentials = repo
        .get_credentials_by_id(id)?
        .ok_or_else(|| ServiceError::not_found("User"))?;
    if !verify_password(&form.old_password, &credentials.password_hash) {
        return Err(ServiceError::Validation(vec![ErrorDetail::field(
            "old_password",
            "Current password is incorrect.",
        )]));
    }
    check_password_policy(
        "new_password",
        &form.new_password,
        credentials.user.email.as_str(),
    )?;

    repo.set_user_password(id, &hash_password(&form.new_password)?)?;
    log::info!("User {id} changed their password");
    Ok(MessageResponse::new("Password changed successfully."))
}

fn set_active<R>(
    repo: &R,
    current: &AuthenticatedUser,
    id: i32,
    is_active: bool,
) -> ServiceResult<UserId>
where
    R: UserReader + UserWriter + ?Sized,
{
    ensure_admin(current)?;
    let id = UserId::new(id)?;
    if !is_active && current.id == id {
        return Err(ServiceError::Form(
            "You cannot deactivate your own account.".into(),
        ));
    }
    load_user(repo, id)?;
    repo.set_user_active(id, is_active)?;
    log::info!(
        "User {id} {} by {}",
        if is_active { "activated" } else { "deactivated" },
        current.id
    );
    Ok(id)
}

pub fn deactivate_user<R>(
    repo: &R,
    current: &AuthenticatedUser,
    id: i32,
) -> ServiceResult<MessageResponse>
where
    R: UserReader + UserWriter + ?Sized,
{
    set_active(repo, current, id, false)?;
    Ok(MessageResponse::new("User deactivated successfully."))
}

pub fn activate_user<R>(
    repo: &R,
    current: &AuthenticatedUser,
    id: i32,
) -> ServiceResult<MessageResponse>
where
    R: UserReader + UserWriter + ?Sized,
{
    set_active(repo, current, id, true)?;
    Ok(MessageResponse::new("User activated successfully."))
}

pub fn user_permissions<R>(
    repo: &R,
    current: &AuthenticatedUser,
    id: i32,
) -> ServiceResult<PermissionsResponse>
where
    R: UserReader + ?Sized,
{
    let id = UserId::new(id)?;
    ensure_self_or_staff(current, id)?;
    Ok(PermissionsResponse::from(&load_user(repo, id)?))
}

/// Creates an administrator account; used by `crm-manage create-admin`.
pub fn create_admin<R>(
    repo: &R,
    email: &str,
    password: &str,
    first_name: &str,
    last_name: &str,
) -> ServiceResult<UserResponse>
where
    R: UserReader + UserWriter + ?Sized,
{
    let email = EmailAddress::new(email)?;
    check_password_policy("password", password, email.as_str())?;
    if repo.get_user_by_email(&email)?.is_some() {
        return Err(ServiceError::Validation(vec![ErrorDetail::field(
            "email",
            "A user with this email already exists.",
        )]));
    }

    let new_user = NewUser::new(
        email,
        hash_password(password)?,
        PersonName::new(first_name)?,
        PersonName::new(last_name)?,
        UserRole::Admin,
    );
    let user = repo.create_user(&new_user)?;
    log::info!("Created admin user {}", user.id);
    Ok(user.into())
}

#[cfg(all(test, feature = "test-mocks"))]
mod tests {
    use super::*;
    use crate::domain::user::UserCredentials;
    use crate::fixtures;
    use crate::repository::mock::MockRepository;
    use crate::services::principal;

    #[test]
    fn sales_cannot_list_users() {
        let repo = MockRepository::new();
        let result = list_users(
            &repo,
            &principal(1, UserRole::Sales),
            UserListParams::default(),
        );
        assert!(matches!(result, Err(ServiceError::Forbidden(_))));
    }

    #[test]
    fn manager_lists_with_filters() {
        let mut repo = MockRepository::new();
        repo.expect_list_users()
            .withf(|q| {
                q.role == Some(UserRole::Support)
                    && q.search.as_deref() == Some("ann")
                    && q.pagination.map(|p| (p.page, p.per_page)) == Some((2, 10))
            })
            .returning(|_| Ok((11, vec![fixtures::user(5, UserRole::Support)])));

        let params = UserListParams {
            search: Some(" ann ".into()),
            role: Some("support".into()),
            page: Some(2),
            page_size: Some(10),
            ..Default::default()
        };
        let page = list_users(&repo, &principal(2, UserRole::Manager), params).unwrap();
        assert_eq!(page.total, 11);
        assert_eq!(page.pages, 2);
        assert_eq!(page.items[0].role_display, "Support Agent");
    }

    #[test]
    fn users_only_see_themselves() {
        let repo = MockRepository::new();
        let result = get_user(&repo, &principal(1, UserRole::Sales), 2);
        assert!(matches!(result, Err(ServiceError::Forbidden(_))));
    }

    #[test]
    fn change_password_checks_old_password() {
        let mut repo = MockRepository::new();
        repo.expect_get_credentials_by_id().returning(|_| {
            Ok(Some(UserCredentials {
                user: fixtures::user(1, UserRole::Sales),
                password_hash: hash_password("old-pass1").unwrap(),
            }))
        });
        let form = |old: &str| ChangePasswordForm {
            old_password: old.into(),
            new_password: "new-pass2".into(),
            new_password_confirm: "new-pass2".into(),
        };

        let err = change_password(&repo, &principal(1, UserRole::Sales), 1, form("nope-123"))
            .unwrap_err();
        assert!(
            matches!(err, ServiceError::Validation(ref d) if d[0].message == "Current password is incorrect.")
        );

        repo.expect_set_user_password()
            .withf(|id, hash| id.get() == 1 && verify_password("new-pass2", hash))
            .times(1)
            .returning(|_, _| Ok(()));
        let ok = change_password(&repo, &principal(1, UserRole::Sales), 1, form("old-pass1"))
            .unwrap();
        assert_eq!(ok.message, "Password changed successfully.");
    }

    #[test]
    fn change_password_is_self_only() {
        let repo = MockRepository::new();
        let form = ChangePasswordForm {
            old_password: "old-pass1".into(),
            new_password: "new-pass2".into(),
            new_password_confirm: "new-pass2".into(),
        };
        let err = change_password(&repo, &principal(1, UserRole::Admin), 2, form).unwrap_err();
        assert!(matches!(err, ServiceError::Forbidden(_)));
    }

    #[test]
    fn admin_cannot_deactivate_self() {
        let repo = MockRepository::new();
        let err = deactivate_user(&repo, &principal(1, UserRole::Admin), 1).unwrap_err();
        assert!(matches!(err, ServiceError::Form(_)));
    }

    #[test]
    fn admin_deactivates_and_activates() {
        let mut repo = MockRepository::new();
        repo.expect_get_user_by_id()
            .returning(|id| Ok(Some(fixtures::user(id.get(), UserRole::Sales))));
        repo.expect_set_user_active()
            .withf(|id, active| id.get() == 3 && !active)
            .times(1)
            .returning(|id, _| Ok(fixtures::user(id.get(), UserRole::Sales)));
        repo.expect_set_user_active()
            .withf(|id, active| id.get() == 3 && *active)
            .times(1)
            .returning(|id, _| Ok(fixtures::user(id.get(), UserRole::Sales)));

        let admin = principal(1, UserRole::Admin);
        assert_eq!(
            deactivate_user(&repo, &admin, 3).unwrap().message,
            "User deactivated successfully."
        );
        assert_eq!(
            activate_user(&repo, &admin, 3).unwrap().message,
            "User activated successfully."
        );
        assert!(activate_user(&repo, &principal(2, UserRole::Manager), 3).is_err());
    }

    #[test]
    fn permissions_follow_role() {
        let mut repo = MockRepository::new();
        repo.expect_get_user_by_id()
            .returning(|_| Ok(Some(fixtures::user(4, UserRole::Manager))));
        let response = user_permissions(&repo, &principal(4, UserRole::Manager), 4).unwrap();
        assert!(response.permissions.contains(&"users.view"));
        assert!(!response.permissions.contains(&"users.manage"));
    }

    #[test]
    fn create_admin_hashes_password_and_sets_role() {
        let mut repo = MockRepository::new();
        repo.expect_get_user_by_email().returning(|_| Ok(None));
        repo.expect_create_user()
            .withf(|new_user| {
                new_user.role == UserRole::Admin
                    && new_user.email.as_str() == "root@example.com"
                    && verify_password("s3cret-pass", &new_user.password_hash)
            })
            .times(1)
            .returning(|_| Ok(fixtures::user(1, UserRole::Admin)));

        let created =
            create_admin(&repo, "Root@Example.com", "s3cret-pass", "Root", "Admin").unwrap();
        assert_eq!(created.role_display, "Administrator");
    }

    #[test]
    fn create_admin_enforces_password_policy() {
        let repo = MockRepository::new();
        let err = create_admin(&repo, "root@example.com", "short", "Root", "Admin").unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
    }
}
