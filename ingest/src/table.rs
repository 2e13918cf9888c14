use std::path::Path;

/// A single extracted row, keeping the column order of the source table
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Record {
    fields: Vec<(String, String)>,
}

impl Record {
    /// build a record by pairing headers with cell values
    pub fn from_pairs<H, V>(headers: H, values: V) -> Self
    where
        H: IntoIterator<Item = String>,
        V: IntoIterator<Item = String>,
    {
        let mut record = Self::default();

        for (header, value) in headers.into_iter().zip(values) {
            record.insert(header, value);
        }

        record
    }

    /// set a column, replacing an existing value in place
    pub fn insert(&mut self, column: impl Into<String>, value: impl Into<String>) {
        let column = column.into();
        let value = value.into();

        match self.fields.iter_mut().find(|(name, _)| *name == column) {
            Some((_, existing)) => *existing = value,
            None => self.fields.push((column, value)),
        }
    }

    pub fn get(&self, column: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value.as_str())
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(name, _)| name.as_str())
    }
}

/// Rows accumulated over all reports of one experiment
#[derive(Debug, Clone, Default)]
pub struct Table {
    rows: Vec<Record>,
}

impl Table {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn extend(&mut self, records: impl IntoIterator<Item = Record>) {
        self.rows.extend(records);
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// union of all row columns in first-seen order
    pub fn columns(&self) -> Vec<String> {
        let mut columns: Vec<String> = Vec::new();

        for column in self.rows.iter().flat_map(Record::columns) {
            if !columns.iter().any(|known| known == column) {
                columns.push(column.to_owned());
            }
        }

        columns
    }

    /// write the table with a header line, cells missing from a row stay empty
    pub fn write_csv(&self, path: &Path) -> Result<(), csv::Error> {
        let columns = self.columns();
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_path(path)?;

        writer.write_record(&columns)?;

        for row in self.rows.iter() {
            writer.write_record(
                columns
                    .iter()
                    .map(|column| row.get(column).unwrap_or_default()),
            )?;
        }

        writer.flush()?;

        Ok(())
    }
}

#[cfg(test)]
mod table_test;
