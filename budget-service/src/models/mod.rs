pub mod attachment;
pub mod budget;

pub use attachment::{Attachment, AttachmentBody, InlineDocument};
pub use budget::{BudgetRequest, BudgetResponse};
