//! The funding-transaction ledger: recorder (write path), aggregation engine
//! (read path) and the request lifecycle that ties them together.

pub mod aggregation;
pub mod error;
pub mod lifecycle;
pub mod lookup;
pub mod model;
pub mod recorder;

pub use aggregation::{
    AggregationEngine, BusinessTrackRecord, CommunityProgress, CommunitySettings, ContributorData,
    ContributorStats, DiscoverCard, PublicLedgerEntry, RequestSummary, RequestTotals,
};
pub use error::{LedgerError, StoreError};
pub use lifecycle::RequestStatus;
pub use model::{
    BusinessProfile, FundingRequest, NewBusiness, Transaction, TransactionStatus, TransactionType,
    UserProfile,
};
pub use recorder::{RecordTransaction, RetryPolicy, TransactionRecorder};
