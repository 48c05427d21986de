use std::collections::HashMap;
use std::fmt;

use serde::Serialize;

/// A column of the student sheet.
///
/// The sheet is addressed by header text, so every variant maps to the exact
/// Russian header used in row 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum StudentField {
    Id,
    FullName,
    Phone,
    Email,
    IdentityNumber,
    BirthDate,
    Gender,
    Address,
    Ulpan,
    Group,
    Level,
    StartDate,
    VoucherStatus,
    VoucherNumber,
    VoucherIssued,
    VoucherExpires,
    PaymentStatus,
    AmountDue,
    Documents,
    Notes,
    CreatedAt,
    UpdatedAt,
    ModifiedBy,
    VerificationStatus,
    Curator,
}

impl StudentField {
    /// All columns in sheet order, `A` through `Y`.
    pub const ALL: [StudentField; 25] = [
        Self::Id,
        Self::FullName,
        Self::Phone,
        Self::Email,
        Self::IdentityNumber,
        Self::BirthDate,
        Self::Gender,
        Self::Address,
        Self::Ulpan,
        Self::Group,
        Self::Level,
        Self::StartDate,
        Self::VoucherStatus,
        Self::VoucherNumber,
        Self::VoucherIssued,
        Self::VoucherExpires,
        Self::PaymentStatus,
        Self::AmountDue,
        Self::Documents,
        Self::Notes,
        Self::CreatedAt,
        Self::UpdatedAt,
        Self::ModifiedBy,
        Self::VerificationStatus,
        Self::Curator,
    ];

    /// Columns matched by free-text search.
    pub const SEARCHABLE: [StudentField; 5] = [
        Self::FullName,
        Self::Phone,
        Self::Email,
        Self::IdentityNumber,
        Self::VoucherNumber,
    ];

    pub fn header(&self) -> &'static str {
        match self {
            Self::Id => "ID",
            Self::FullName => "ФИО",
            Self::Phone => "Телефон",
            Self::Email => "Email",
            Self::IdentityNumber => "Удостоверение",
            Self::BirthDate => "Дата рождения",
            Self::Gender => "Пол",
            Self::Address => "Адрес",
            Self::Ulpan => "Ульпан",
            Self::Group => "Группа",
            Self::Level => "Уровень",
            Self::StartDate => "Дата начала",
            Self::VoucherStatus => "Статус ваучера",
            Self::VoucherNumber => "Номер ваучера",
            Self::VoucherIssued => "Дата выдачи",
            Self::VoucherExpires => "Срок действия",
            Self::PaymentStatus => "Статус оплаты",
            Self::AmountDue => "Сумма к доплате",
            Self::Documents => "Документы",
            Self::Notes => "Примечания",
            Self::CreatedAt => "Дата создания",
            Self::UpdatedAt => "Последнее изменение",
            Self::ModifiedBy => "Изменил",
            Self::VerificationStatus => "Статус проверки",
            Self::Curator => "Куратор",
        }
    }

    pub fn from_header(header: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|field| field.header() == header)
    }
}

impl fmt::Display for StudentField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.header())
    }
}

/// Field values supplied for a write or used as search filters.
pub type StudentFields = HashMap<StudentField, String>;

/// One data row of the student sheet.
///
/// Values are keyed by the header text found in row 1, so columns this crate
/// does not know about are kept too.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StudentRecord {
    /// 1-based sheet row. Row 1 is the header, so data starts at 2.
    pub row_index: u32,
    pub values: HashMap<String, String>,
}

impl StudentRecord {
    pub(crate) fn from_row(row_index: u32, headers: &[String], row: &[String]) -> Self {
        let values = headers
            .iter()
            .enumerate()
            .filter(|(_, header)| !header.is_empty())
            .map(|(col, header)| (header.clone(), row.get(col).cloned().unwrap_or_default()))
            .collect();
        Self { row_index, values }
    }

    /// The value of a known column, `""` when blank or absent.
    pub fn get(&self, field: StudentField) -> &str {
        self.get_header(field.header()).unwrap_or_default()
    }

    pub fn get_header(&self, header: &str) -> Option<&str> {
        self.values.get(header).map(String::as_str)
    }

    pub fn id(&self) -> &str {
        self.get(StudentField::Id)
    }

    pub fn ulpan(&self) -> &str {
        self.get(StudentField::Ulpan)
    }

    /// Known columns only.
    pub fn fields(&self) -> StudentFields {
        StudentField::ALL
            .into_iter()
            .filter_map(|field| {
                self.get_header(field.header())
                    .map(|value| (field, value.to_owned()))
            })
            .collect()
    }

    /// Case-insensitive substring match over the searchable columns.
    /// `needle` must already be lowercase.
    pub(crate) fn matches_query(&self, needle: &str) -> bool {
        StudentField::SEARCHABLE
            .iter()
            .any(|field| self.get(*field).to_lowercase().contains(needle))
    }

    /// Exact match on every non-empty filter value.
    pub(crate) fn matches_filters(&self, filters: &StudentFields) -> bool {
        filters
            .iter()
            .filter(|(_, wanted)| !wanted.is_empty())
            .all(|(field, wanted)| self.get(*field) == wanted)
    }
}
