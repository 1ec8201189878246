pub mod ai;
pub mod config;
pub mod models;
pub mod speech;
pub mod store;
pub mod summary;
pub mod transfer;

// Re-export commonly used types
pub use ai::{
    AiAnomalyResult, AiClient, AiError, AiForecastResult, AiMode, AssistantDispatcher,
    AssistantFeature, AssistantReply, AssistantRequest, Completion, DispatcherSettings,
    ReasoningService, RequestId,
};
pub use config::{api_key_from_env, get_config_path, Config};
pub use models::{
    demo_products, demo_transactions, Product, ProductCategory, ProductPatch, Transaction,
    TransactionPatch, TransactionStatus, TransactionType, View,
};
pub use speech::{
    clean_for_speech, dictation_number, dictation_text, Activation, SpeechAction, SpeechBackend,
    SpeechController, SpeechError, SpeechEvent, SpeechState, Utterance, UtteranceId,
    VoiceSettings,
};
pub use store::{
    Confirm, ImportReport, Record, RecordKind, RecordPatch, RecordStore, StoreError, StoreEvent,
    Stored, SubscriptionId,
};
pub use summary::{summarize, ContextDigest, SummaryOptions};
pub use transfer::TransferError;
