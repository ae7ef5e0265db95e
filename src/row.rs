/// Header names of the sheet, in column order.
pub const COLUMNS: [&str; 8] = [
    "Assigned",
    "MSISDN",
    "Category",
    "Status",
    "In Process Date",
    "Activation Date",
    "Remove",
    "@dropdown",
];

pub const STATUS_COLUMN: usize = 3;

/// One line of the sheet mapped onto the fixed eight column schema.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Row {
    pub assigned: String,
    pub msisdn: String,
    pub category: String,
    pub status: String,
    pub in_process_date: String,
    pub activation_date: String,
    pub remove: String,
    pub dropdown: String,
}

impl Row {
    /// Maps cells by position. Short rows are padded with empty strings,
    /// cells beyond the eighth column are ignored.
    pub fn from_cells<S: AsRef<str>>(cells: &[S]) -> Self {
        let cell = |idx: usize| {
            cells
                .get(idx)
                .map(|c| c.as_ref().to_string())
                .unwrap_or_default()
        };
        Row {
            assigned: cell(0),
            msisdn: cell(1),
            category: cell(2),
            status: cell(3),
            in_process_date: cell(4),
            activation_date: cell(5),
            remove: cell(6),
            dropdown: cell(7),
        }
    }

    pub fn get(&self, idx: usize) -> Option<&str> {
        let value = match idx {
            0 => &self.assigned,
            1 => &self.msisdn,
            2 => &self.category,
            3 => &self.status,
            4 => &self.in_process_date,
            5 => &self.activation_date,
            6 => &self.remove,
            7 => &self.dropdown,
            _ => return None,
        };
        Some(value.as_str())
    }

    pub fn fields(&self) -> [&str; 8] {
        [
            &self.assigned,
            &self.msisdn,
            &self.category,
            &self.status,
            &self.in_process_date,
            &self.activation_date,
            &self.remove,
            &self.dropdown,
        ]
    }
}

/// Drops the header line and maps every remaining line to a `Row`.
pub fn rows_from_values(values: Vec<Vec<String>>) -> Vec<Row> {
    values
        .iter()
        .skip(1)
        .map(|cells| Row::from_cells(cells.as_slice()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn header_is_dropped_and_fields_are_named() {
        let values = vec![
            strings(&COLUMNS),
            strings(&[
                "Alice",
                "1234567890",
                "Gold",
                "Active",
                "2024-01-01",
                "2024-01-05",
                "No",
                "x",
            ]),
        ];
        let rows = rows_from_values(values);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].category, "Gold");
        assert_eq!(rows[0].status, "Active");
        assert_eq!(rows[0].assigned, "Alice");
        assert_eq!(rows[0].dropdown, "x");
    }

    #[test]
    fn short_rows_default_to_empty() {
        let row = Row::from_cells(&["Bob", "555"]);
        assert_eq!(row.msisdn, "555");
        assert_eq!(row.category, "");
        assert_eq!(row.fields()[7], "");
    }

    #[test]
    fn surplus_cells_are_ignored() {
        let row = Row::from_cells(&["a", "b", "c", "d", "e", "f", "g", "h", "i"]);
        assert_eq!(row.fields(), ["a", "b", "c", "d", "e", "f", "g", "h"]);
        assert_eq!(row.get(8), None);
    }

    #[test]
    fn empty_values_yield_no_rows() {
        assert!(rows_from_values(Vec::new()).is_empty());
        assert!(rows_from_values(vec![strings(&COLUMNS)]).is_empty());
    }

    #[test]
    fn get_matches_column_order() {
        let row = Row::from_cells(&COLUMNS);
        for (idx, name) in COLUMNS.iter().enumerate() {
            assert_eq!(row.get(idx), Some(*name));
        }
        assert_eq!(row.get(STATUS_COLUMN), Some("Status"));
    }
}
