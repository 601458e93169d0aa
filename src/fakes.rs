//! In-memory collaborators used by unit tests.

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicBool, Ordering},
        Mutex,
    },
};

use async_trait::async_trait;
use bytes::Bytes;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
    auth::{
        repo::UserRepository,
        repo_types::{DuplicateEmail, NewUser, Role, User, UserStatus},
    },
    images::{repo::ImageRepository, repo_types::Image},
    storage::StorageClient,
};

#[derive(Default)]
pub struct MemUsers {
    rows: Mutex<Vec<User>>,
    /// Makes `email_exists` report `false`, as when two registrations race.
    pub skip_exists: AtomicBool,
}

impl MemUsers {
    pub fn count(&self) -> usize {
        self.rows.lock().unwrap().len()
    }
}

#[async_trait]
impl UserRepository for MemUsers {
    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<User>> {
        Ok(self.rows.lock().unwrap().iter().find(|u| u.id == id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<User>> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn list_all(&self) -> anyhow::Result<Vec<User>> {
        let mut rows = self.rows.lock().unwrap().clone();
        rows.reverse();
        Ok(rows)
    }

    async fn create(&self, user: NewUser) -> anyhow::Result<User> {
        let mut rows = self.rows.lock().unwrap();
        if rows.iter().any(|u| u.email.eq_ignore_ascii_case(&user.email)) {
            return Err(DuplicateEmail(user.email).into());
        }
        let created = User {
            id: Uuid::new_v4(),
            email: user.email,
            password_hash: user.password_hash,
            first_name: user.first_name,
            last_name: user.last_name,
            role: user.role,
            status: UserStatus::Active,
            created_at: OffsetDateTime::now_utc(),
        };
        rows.push(created.clone());
        Ok(created)
    }

    async fn update_status(&self, id: Uuid, status: UserStatus) -> anyhow::Result<bool> {
        let mut rows = self.rows.lock().unwrap();
        match rows.iter_mut().find(|u| u.id == id) {
            Some(u) => {
                u.status = status;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete(&self, id: Uuid) -> anyhow::Result<bool> {
        let mut rows = self.rows.lock().unwrap();
        let before = rows.len();
        rows.retain(|u| u.id != id);
        Ok(rows.len() != before)
    }

    async fn email_exists(&self, email: &str) -> anyhow::Result<bool> {
        if self.skip_exists.load(Ordering::SeqCst) {
            return Ok(false);
        }
        Ok(self.find_by_email(email).await?.is_some())
    }

    async fn any_admin(&self) -> anyhow::Result<bool> {
        Ok(self.rows.lock().unwrap().iter().any(|u| u.role == Role::Admin))
    }
}

#[derive(Default)]
pub struct MemImages {
    rows: Mutex<Vec<Image>>,
    pub fail_create: AtomicBool,
}

impl MemImages {
    pub fn count(&self) -> usize {
        self.rows.lock().unwrap().len()
    }
}

#[async_trait]
impl ImageRepository for MemImages {
    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<Image>> {
        Ok(self.rows.lock().unwrap().iter().find(|i| i.id == id).cloned())
    }

    async fn list_by_owner(&self, owner_id: Uuid) -> anyhow::Result<Vec<Image>> {
        let mut rows: Vec<Image> = self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|i| i.user_id == owner_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.uploaded_at.cmp(&a.uploaded_at));
        Ok(rows)
    }

    async fn create(&self, image: &Image) -> anyhow::Result<()> {
        if self.fail_create.load(Ordering::SeqCst) {
            anyhow::bail!("database unavailable");
        }
        self.rows.lock().unwrap().push(image.clone());
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> anyhow::Result<()> {
        self.rows.lock().unwrap().retain(|i| i.id != id);
        Ok(())
    }

    async fn is_owner(&self, image_id: Uuid, owner_id: Uuid) -> anyhow::Result<bool> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .any(|i| i.id == image_id && i.user_id == owner_id))
    }
}

#[derive(Default)]
pub struct MemStorage {
    objects: Mutex<HashMap<String, (Bytes, String)>>,
    pub fail_delete: AtomicBool,
}

impl MemStorage {
    pub fn contains(&self, key: &str) -> bool {
        self.objects.lock().unwrap().contains_key(key)
    }

    pub fn count(&self) -> usize {
        self.objects.lock().unwrap().len()
    }
}

#[async_trait]
impl StorageClient for MemStorage {
    async fn put_object(&self, key: &str, body: Bytes, content_type: &str) -> anyhow::Result<()> {
        self.objects
            .lock()
            .unwrap()
            .insert(key.to_string(), (body, content_type.to_string()));
        Ok(())
    }

    async fn get_object(&self, key: &str) -> anyhow::Result<Bytes> {
        self.objects
            .lock()
            .unwrap()
            .get(key)
            .map(|(b, _)| b.clone())
            .ok_or_else(|| anyhow::anyhow!("no such key: {key}"))
    }

    async fn delete_object(&self, key: &str) -> anyhow::Result<()> {
        if self.fail_delete.load(Ordering::SeqCst) {
            anyhow::bail!("storage unavailable");
        }
        self.objects.lock().unwrap().remove(key);
        Ok(())
    }

    async fn presign_get(&self, key: &str, seconds: u64) -> anyhow::Result<String> {
        Ok(format!("https://fake.local/{}?expires={}", key, seconds))
    }
}
