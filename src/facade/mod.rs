//! Entity-shaped access to students and their documents.
//!
//! Both managers check the session and the caller's permissions before
//! touching the backend. Student reads go through the sheet cache; document
//! operations talk to file storage directly.

mod documents;
mod student;
mod students;

pub use documents::{DocumentManager, DocumentType, StudentDocument, UploadedDocument};
pub use student::{StudentField, StudentFields, StudentRecord};
pub use students::{StudentLookup, StudentsManager};
