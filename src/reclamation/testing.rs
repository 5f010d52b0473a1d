//! In-memory `ReclamationApi` for tests.

use crate::{
    error::{Error, ErrorKey, Result},
    reclamation::{
        api::{RawPage, ReclamationApi},
        schema::{NewReclamation, Reclamation},
    },
};
use async_trait::async_trait;
use serde_json::Value;
use std::{
    sync::{atomic::{AtomicUsize, Ordering}, Mutex},
    time::Duration,
};

#[derive(Default)]
pub struct FakeApi {
    pub records: Mutex<Vec<Reclamation>>,
    pub list_calls: AtomicUsize,
    pub get_calls: AtomicUsize,
    pub list_delay: Mutex<Duration>,
    pub fail_list_times: AtomicUsize,
    pub reject_list: Mutex<bool>,
}

impl FakeApi {
    pub fn with_records(count: i64) -> Self {
        let api = FakeApi::default();
        *api.records.lock().unwrap() = (1..=count)
            .map(|id| Reclamation {
                id,
                name: format!("reclamation-{}", id),
                link: format!("https://example.org/{}", id),
                description: None,
            })
            .collect();
        api
    }

    fn duplicate_name(&self, name: &str, except: Option<i64>) -> bool {
        self.records
            .lock()
            .unwrap()
            .iter()
            .any(|r| r.name == name && Some(r.id) != except)
    }
}

pub fn name_used() -> Error {
    Error::Rejected {
        status: 400,
        error_key: Some(ErrorKey::NameAlreadyUsed),
        message: "Name already used".to_string(),
    }
}

#[async_trait]
impl ReclamationApi for FakeApi {
    async fn list(&self, page: u32, size: u32) -> Result<RawPage> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        // Page contents are read before the delay, like a slow response
        // that left the server before a concurrent mutation.
        let mut records = self.records.lock().unwrap().clone();
        records.sort_by(|a, b| b.id.cmp(&a.id));
        let body: Vec<Reclamation> = records
            .iter()
            .skip((page * size) as usize)
            .take(size as usize)
            .cloned()
            .collect();

        let delay = *self.list_delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        if self
            .fail_list_times
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(Error::Network("connection reset".to_string()));
        }
        if *self.reject_list.lock().unwrap() {
            return Err(Error::Rejected {
                status: 500,
                error_key: None,
                message: "Internal Server Error".to_string(),
            });
        }

        Ok(RawPage {
            body: serde_json::to_value(body)?,
            total_count: Some(records.len().to_string()),
        })
    }

    async fn get(&self, id: i64) -> Result<Value> {
        self.get_calls.fetch_add(1, Ordering::SeqCst);
        let records = self.records.lock().unwrap();
        match records.iter().find(|r| r.id == id) {
            Some(record) => Ok(serde_json::to_value(record)?),
            None => Err(Error::Rejected {
                status: 404,
                error_key: None,
                message: "Not Found".to_string(),
            }),
        }
    }

    async fn update(&self, record: &Reclamation) -> Result<Value> {
        if self.duplicate_name(&record.name, Some(record.id)) {
            return Err(name_used());
        }
        let mut records = self.records.lock().unwrap();
        for existing in records.iter_mut().filter(|r| r.id == record.id) {
            *existing = record.clone();
        }
        Ok(serde_json::to_value(record)?)
    }

    async fn create(&self, payload: &NewReclamation) -> Result<Value> {
        if self.duplicate_name(&payload.name, None) {
            return Err(name_used());
        }
        let mut records = self.records.lock().unwrap();
        let id = records.iter().map(|r| r.id).max().unwrap_or(0) + 1;
        let record = Reclamation {
            id,
            name: payload.name.clone(),
            link: payload.link.clone(),
            description: payload.description.clone(),
        };
        records.push(record.clone());
        Ok(serde_json::to_value(record)?)
    }

    async fn delete(&self, id: i64) -> Result<()> {
        self.records.lock().unwrap().retain(|r| r.id != id);
        Ok(())
    }
}
