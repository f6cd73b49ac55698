//! Shared application state handed to every handler.

use std::sync::Arc;

use kb_core::{ConversationEngine, ExchangeEngine};

#[derive(Clone)]
pub struct AppState {
    pub conversations: Arc<ConversationEngine>,
    pub exchanges: Arc<ExchangeEngine>,
}
