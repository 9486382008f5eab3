use crate::data::row::PropertyRow;

/// A titled section of rows.
///
/// `key`, when set, names the section for [`Schema::replace_rows`] and is
/// the merge key of a `propertyList` row without identifier.
///
/// [`Schema::replace_rows`]: crate::data::schema::Schema::replace_rows
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyGroup {
    pub title: String,
    pub key: Option<String>,
    /// Text shown above the rows.
    pub header: Option<String>,
    /// Text shown below the rows.
    pub footer: Option<String>,
    /// Rows in display order.
    pub rows: Vec<PropertyRow>,
}

impl PropertyGroup {
    pub fn new(title: impl Into<String>, rows: Vec<PropertyRow>) -> Self {
        Self {
            title: title.into(),
            key: None,
            header: None,
            footer: None,
            rows,
        }
    }

    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    pub fn with_header(mut self, header: impl Into<String>) -> Self {
        self.header = Some(header.into());
        self
    }

    pub fn with_footer(mut self, footer: impl Into<String>) -> Self {
        self.footer = Some(footer.into());
        self
    }
}
