//! GetSubscriberHandler - query for a stored subscriber record.

use std::sync::Arc;

use crate::domain::foundation::ExternalUserId;
use crate::domain::subscriber::Subscriber;
use crate::ports::SubscriberStore;

use super::AccessCommandError;

#[derive(Debug, Clone)]
pub struct GetSubscriberQuery {
    pub external_user_id: ExternalUserId,
}

pub struct GetSubscriberHandler {
    store: Arc<dyn SubscriberStore>,
}

impl GetSubscriberHandler {
    pub fn new(store: Arc<dyn SubscriberStore>) -> Self {
        Self { store }
    }

    pub async fn handle(
        &self,
        query: GetSubscriberQuery,
    ) -> Result<Subscriber, AccessCommandError> {
        self.store
            .get_by_external_id(&query.external_user_id)
            .await?
            .ok_or(AccessCommandError::NotFound(query.external_user_id))
    }
}
