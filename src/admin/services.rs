use tracing::{error, info, instrument};
use uuid::Uuid;

use crate::{
    auth::{dto::PublicUser, repo_types::UserStatus},
    error::{AppError, AppResult},
    images,
    state::AppState,
};

#[instrument(skip(st))]
pub async fn list_users(st: &AppState) -> AppResult<Vec<PublicUser>> {
    let users = st.users.list_all().await?;
    Ok(users.into_iter().map(PublicUser::from).collect())
}

/// Idempotent: applying the current status again succeeds.
#[instrument(skip(st))]
pub async fn set_status(st: &AppState, user_id: Uuid, status: UserStatus) -> AppResult<()> {
    if !st.users.update_status(user_id, status).await? {
        return Err(AppError::NotFound);
    }
    info!(%user_id, ?status, "user status changed");
    Ok(())
}

/// Removes the user's images (blob, then record) before the user row.
/// A failure part-way leaves the user in place so the call can be retried.
#[instrument(skip(st))]
pub async fn delete_user(st: &AppState, user_id: Uuid) -> AppResult<()> {
    if st.users.find_by_id(user_id).await?.is_none() {
        return Err(AppError::NotFound);
    }

    let purged = images::services::purge_owner(st, user_id)
        .await
        .map_err(|e| {
            error!(error = ?e, %user_id, "image cascade failed; user kept");
            AppError::Internal(e)
        })?;

    if !st.users.delete(user_id).await? {
        return Err(AppError::NotFound);
    }
    info!(%user_id, purged, "user deleted");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        auth::{
            dto::{LoginRequest, RegisterRequest},
            repo_types::Role,
            services as auth,
        },
        images::{dto::UploadItem, services as image_svc},
    };
    use bytes::Bytes;
    use std::sync::atomic::Ordering;

    async fn register(st: &AppState, email: &str) -> Uuid {
        auth::register(
            st,
            RegisterRequest {
                email: email.into(),
                password: "pw1".into(),
                first_name: "F".into(),
                last_name: "L".into(),
            },
        )
        .await
        .unwrap();
        st.users.find_by_email(email).await.unwrap().unwrap().id
    }

    fn png(len: usize) -> UploadItem {
        UploadItem {
            body: Bytes::from(vec![0u8; len]),
            file_name: "pic.png".into(),
            content_type: "image/png".into(),
        }
    }

    #[tokio::test]
    async fn ban_and_unban_are_idempotent_and_gate_login() {
        let (st, _) = AppState::fake();
        let id = register(&st, "a@x.com").await;
        let creds = || LoginRequest {
            email: "a@x.com".into(),
            password: "pw1".into(),
        };

        set_status(&st, id, UserStatus::Banned).await.unwrap();
        set_status(&st, id, UserStatus::Banned).await.unwrap();
        assert!(matches!(auth::login(&st, creds()).await, Err(AppError::Unauthorized)));

        set_status(&st, id, UserStatus::Active).await.unwrap();
        assert!(auth::login(&st, creds()).await.is_ok());

        let err = set_status(&st, Uuid::new_v4(), UserStatus::Banned).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound));
    }

    #[tokio::test]
    async fn list_users_shows_public_view() {
        let (st, _) = AppState::fake();
        register(&st, "a@x.com").await;
        register(&st, "b@x.com").await;
        let users = list_users(&st).await.unwrap();
        assert_eq!(users.len(), 2);
        assert!(users.iter().all(|u| u.role == Role::User));
        let json = serde_json::to_string(&users).unwrap();
        assert!(!json.contains("argon2"));
    }

    #[tokio::test]
    async fn delete_user_cascades_to_images_and_blobs() {
        let (st, fakes) = AppState::fake();
        let victim = register(&st, "a@x.com").await;
        let bystander = register(&st, "b@x.com").await;
        for _ in 0..3 {
            image_svc::upload(&st, victim, png(64)).await.unwrap();
        }
        let kept = image_svc::upload(&st, bystander, png(64)).await.unwrap();

        delete_user(&st, victim).await.unwrap();

        assert_eq!(fakes.images.count(), 1);
        assert_eq!(fakes.storage.count(), 1);
        assert!(image_svc::list_for_owner(&st, victim).await.unwrap().is_empty());
        assert!(image_svc::get_by_id(&st, kept.id).await.is_ok());
        let users = list_users(&st).await.unwrap();
        assert!(users.iter().all(|u| u.id != victim));
        assert!(matches!(delete_user(&st, victim).await, Err(AppError::NotFound)));
    }

    #[tokio::test]
    async fn failed_cascade_keeps_user() {
        let (st, fakes) = AppState::fake();
        let id = register(&st, "a@x.com").await;
        image_svc::upload(&st, id, png(64)).await.unwrap();
        fakes.storage.fail_delete.store(true, Ordering::SeqCst);

        let err = delete_user(&st, id).await.unwrap_err();
        assert!(matches!(err, AppError::Internal(_)));
        assert!(st.users.find_by_id(id).await.unwrap().is_some());
        assert_eq!(fakes.images.count(), 1);
    }
}
