use std::sync::Arc;

use async_trait::async_trait;

use super::student::{StudentField, StudentFields, StudentRecord};
use crate::cache::SheetClient;
use crate::config::SheetConfig;
use crate::crypto::random_uppercase;
use crate::gateway::{RemoteGateway, SheetData, SheetRange, WriteResult};
use crate::session::SessionContext;
use crate::validators::{validate_email, validate_identity_number, validate_phone, ValidationError};
use crate::{AuthorizationPolicy, CrmError, LOG_TARGET, Permission, SessionUser, SharedClock};

/// Resolves a student the current session is allowed to see.
///
/// Out-of-scope students are reported as `StudentNotFound`, exactly like
/// missing ones.
#[async_trait]
pub trait StudentLookup: Send + Sync {
    async fn find_student(&self, student_id: &str) -> Result<StudentRecord, CrmError>;
}

/// Student rows of the main sheet.
///
/// Reads are served through the sheet cache and filtered to the caller's
/// ulpan for scoped roles. Writes always carry a fresh modification date and
/// the modifier's name.
pub struct StudentsManager<G: RemoteGateway> {
    client: Arc<SheetClient<G>>,
    session: Arc<dyn SessionContext>,
    policy: Arc<AuthorizationPolicy>,
    config: SheetConfig,
    clock: SharedClock,
}

impl<G: RemoteGateway> StudentsManager<G> {
    pub fn new(
        client: Arc<SheetClient<G>>,
        session: Arc<dyn SessionContext>,
        policy: Arc<AuthorizationPolicy>,
        config: SheetConfig,
        clock: SharedClock,
    ) -> Self {
        Self {
            client,
            session,
            policy,
            config,
            clock,
        }
    }

    async fn authorize(&self, permission: Permission) -> Result<SessionUser, CrmError> {
        let user = self.session.authenticated_user().await?;
        self.policy.require_permission(Some(&user), permission)?;
        Ok(user)
    }

    fn main_range(&self) -> SheetRange {
        SheetRange::new(&self.config.main_sheet, &self.config.main_range)
    }

    /// Row 1 is the header row; every later row becomes a record.
    fn parse(data: SheetData) -> Vec<StudentRecord> {
        let mut rows = data.values.into_iter();
        let Some(headers) = rows.next() else {
            return Vec::new();
        };
        rows.zip(2u32..)
            .map(|(row, row_index)| StudentRecord::from_row(row_index, &headers, &row))
            .collect()
    }

    fn visible_to(&self, user: &SessionUser, students: Vec<StudentRecord>) -> Vec<StudentRecord> {
        students
            .into_iter()
            .filter(|student| self.policy.can_access_ulpan(Some(user), student.ulpan()))
            .collect()
    }

    fn today(&self) -> String {
        self.clock.local().format("%d.%m.%Y").to_string()
    }

    fn modifier(&self, user: &SessionUser) -> String {
        if user.name.trim().is_empty() {
            self.config.system_actor.clone()
        } else {
            user.name.clone()
        }
    }

    /// The row a write would produce must stay within the caller's ulpan.
    fn require_target_ulpan(&self, user: &SessionUser, fields: &StudentFields) -> Result<(), CrmError> {
        let ulpan = fields
            .get(&StudentField::Ulpan)
            .map(String::as_str)
            .unwrap_or_default();
        self.policy.require_ulpan_access(Some(user), ulpan)
    }

    /// Checks the formatted columns that were given a value.
    fn validate_fields(fields: &StudentFields) -> Result<(), ValidationError> {
        let filled = |field| fields.get(&field).map(|v| v.trim()).filter(|v| !v.is_empty());
        if let Some(phone) = filled(StudentField::Phone) {
            validate_phone(phone)?;
        }
        if let Some(email) = filled(StudentField::Email) {
            validate_email(email)?;
        }
        if let Some(id) = filled(StudentField::IdentityNumber) {
            validate_identity_number(id)?;
        }
        Ok(())
    }

    /// Lays `fields` out in header order. Columns without a value are blank.
    fn build_row(&self, fields: &StudentFields) -> Vec<String> {
        self.config
            .main_headers
            .iter()
            .map(|field| fields.get(field).cloned().unwrap_or_default())
            .collect()
    }

    /// Every student the caller may see.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "get_all_students", skip_all, err)
    )]
    pub async fn get_all_students(&self) -> Result<Vec<StudentRecord>, CrmError> {
        let user = self.authorize(Permission::Read).await?;
        let data = self.client.read(&self.main_range()).await?;
        let students = self.visible_to(&user, Self::parse(data));
        log::debug!(
            target: LOG_TARGET,
            "msg=\"students loaded\", count={}",
            students.len()
        );
        Ok(students)
    }

    pub async fn find_student(&self, student_id: &str) -> Result<StudentRecord, CrmError> {
        self.get_all_students()
            .await?
            .into_iter()
            .find(|student| student.id() == student_id)
            .ok_or_else(|| CrmError::StudentNotFound(student_id.to_owned()))
    }

    /// Reads the sheet past the cache and locates the student's current row.
    async fn locate(&self, user: &SessionUser, student_id: &str) -> Result<StudentRecord, CrmError> {
        let data = self.client.read_fresh(&self.main_range()).await?;
        self.visible_to(user, Self::parse(data))
            .into_iter()
            .find(|student| student.id() == student_id)
            .ok_or_else(|| CrmError::StudentNotFound(student_id.to_owned()))
    }

    /// Appends a new student and returns the generated identifier.
    ///
    /// The identifier, creation date, modification date and modifier columns
    /// are filled in here; values supplied for them are ignored.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "add_student", skip_all, err)
    )]
    pub async fn add_student(&self, fields: &StudentFields) -> Result<String, CrmError> {
        let user = self.authorize(Permission::Write).await?;
        Self::validate_fields(fields)?;
        self.require_target_ulpan(&user, fields)?;

        let student_id = format!(
            "STD_{}_{}",
            self.clock.utc().timestamp_millis(),
            random_uppercase(5)
        );
        let today = self.today();
        let mut fields = fields.clone();
        fields.insert(StudentField::Id, student_id.clone());
        fields.insert(StudentField::CreatedAt, today.clone());
        fields.insert(StudentField::UpdatedAt, today);
        fields.insert(StudentField::ModifiedBy, self.modifier(&user));

        self.client
            .append_row(&self.config.main_sheet, &self.build_row(&fields))
            .await?;
        log::info!(
            target: LOG_TARGET,
            "msg=\"student added\", student_id={student_id}, by={}",
            user.id
        );
        Ok(student_id)
    }

    /// Overwrites one sheet row.
    ///
    /// Only `fields` are written; every other column of the row is blanked,
    /// so callers pass the complete record. Prefer
    /// [`update_student`](Self::update_student), which cannot hit a shifted
    /// row.
    ///
    /// # Errors
    ///
    /// `StudentNotFound` for the header row or a row past the data.
    /// `PermissionDenied` when the row currently belongs to, or would be
    /// moved to, an ulpan outside the caller's scope.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "update_student_at_row", skip_all, err)
    )]
    pub async fn update_student_at_row(
        &self,
        row_index: u32,
        fields: &StudentFields,
    ) -> Result<WriteResult, CrmError> {
        let user = self.authorize(Permission::Write).await?;
        Self::validate_fields(fields)?;
        if row_index < 2 {
            return Err(CrmError::StudentNotFound(format!("row {row_index}")));
        }
        self.require_target_ulpan(&user, fields)?;

        let data = self.client.read_fresh(&self.main_range()).await?;
        let current = Self::parse(data)
            .into_iter()
            .find(|student| student.row_index == row_index)
            .ok_or_else(|| CrmError::StudentNotFound(format!("row {row_index}")))?;
        self.policy.require_ulpan_access(Some(&user), current.ulpan())?;

        self.write_row(&user, row_index, fields.clone()).await
    }

    async fn write_row(
        &self,
        user: &SessionUser,
        row_index: u32,
        mut fields: StudentFields,
    ) -> Result<WriteResult, CrmError> {
        fields.insert(StudentField::UpdatedAt, self.today());
        fields.insert(StudentField::ModifiedBy, self.modifier(user));

        let range = SheetRange::row(
            &self.config.main_sheet,
            row_index,
            self.config.main_headers.len(),
        );
        let result = self
            .client
            .update_range(&range, &[self.build_row(&fields)])
            .await?;
        log::info!(
            target: LOG_TARGET,
            "msg=\"student updated\", row={row_index}, by={}",
            user.id
        );
        Ok(result)
    }

    /// Updates a student by identifier.
    ///
    /// The row is located with a fresh read right before the write, and
    /// columns not present in `fields` keep their current values.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "update_student", skip_all, err)
    )]
    pub async fn update_student(
        &self,
        student_id: &str,
        fields: &StudentFields,
    ) -> Result<WriteResult, CrmError> {
        let user = self.authorize(Permission::Write).await?;
        Self::validate_fields(fields)?;
        let current = self.locate(&user, student_id).await?;

        let mut merged = current.fields();
        merged.extend(fields.iter().map(|(field, value)| (*field, value.clone())));
        merged.insert(StudentField::Id, student_id.to_owned());
        self.require_target_ulpan(&user, &merged)?;

        self.write_row(&user, current.row_index, merged).await
    }

    /// Deletes a student row by identifier. Later rows shift up by one.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "delete_student", skip_all, err)
    )]
    pub async fn delete_student(&self, student_id: &str) -> Result<(), CrmError> {
        let user = self.authorize(Permission::Delete).await?;
        let current = self.locate(&user, student_id).await?;

        self.client
            .delete_row(&self.config.main_sheet, current.row_index)
            .await?;
        log::info!(
            target: LOG_TARGET,
            "msg=\"student deleted\", student_id={student_id}, row={}, by={}",
            current.row_index,
            user.id
        );
        Ok(())
    }

    /// Free-text search over name, phone, email, identity number and voucher
    /// number, narrowed by exact-match `filters`. Empty filter values are
    /// ignored.
    pub async fn search_students(
        &self,
        query: &str,
        filters: &StudentFields,
    ) -> Result<Vec<StudentRecord>, CrmError> {
        let needle = query.trim().to_lowercase();
        Ok(self
            .get_all_students()
            .await?
            .into_iter()
            .filter(|student| needle.is_empty() || student.matches_query(&needle))
            .filter(|student| student.matches_filters(filters))
            .collect())
    }

    /// Creates the main sheet with the configured header row when the
    /// spreadsheet has no such tab yet. Needs `manage_users`.
    pub async fn ensure_main_sheet(&self) -> Result<bool, CrmError> {
        let user = self.authorize(Permission::ManageUsers).await?;
        let headers: Vec<String> = self
            .config
            .main_headers
            .iter()
            .map(|field| field.header().to_owned())
            .collect();
        let created = self
            .client
            .ensure_sheet(&self.config.main_sheet, &headers)
            .await?;
        if created {
            log::info!(
                target: LOG_TARGET,
                "msg=\"main sheet provisioned\", sheet=\"{}\", user_id={}",
                self.config.main_sheet,
                user.id
            );
        }
        Ok(created)
    }

    pub fn client(&self) -> &Arc<SheetClient<G>> {
        &self.client
    }
}

#[async_trait]
impl<G: RemoteGateway> StudentLookup for StudentsManager<G> {
    async fn find_student(&self, student_id: &str) -> Result<StudentRecord, CrmError> {
        StudentsManager::find_student(self, student_id).await
    }
}
