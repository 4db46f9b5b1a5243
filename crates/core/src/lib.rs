pub mod alerts;
pub mod config;
pub mod domain;
pub mod errors;
pub mod fees;
pub mod ranking;
pub mod validation;

pub use alerts::{Alert, AlertCenter, AlertLevel};
pub use domain::bid::{Bid, BidId, BidStatus};
pub use domain::chat::{ChatMessage, ChatMessageId};
pub use domain::tender::{Tender, TenderAward, TenderId, TenderStatus, BIDDING_WINDOW_DAYS};
pub use domain::user::{Role, UserId, UserProfile};
pub use errors::{ApplicationError, DomainError};
pub use fees::{split_amount, FeeSplit};
pub use validation::{BidDraft, MessageDraft, TenderDraft};
