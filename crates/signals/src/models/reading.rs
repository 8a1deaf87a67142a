//! Reading model representing one validated device log line

use serde_json::Value;

use crate::parse::RowError;

/// A single sensor reading: when it was taken and what was counted
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reading {
    /// Unix timestamp reported by the device (always finite)
    pub timestamp: f64,
    /// Event count for this interval
    pub count: i64,
}

impl Reading {
    pub fn new(timestamp: f64, count: i64) -> Self {
        Self { timestamp, count }
    }

    /// Cell values for this reading, in sheet column order
    pub fn to_row(&self) -> Vec<Value> {
        vec![Value::from(self.timestamp), Value::from(self.count)]
    }
}

/// A device log line that could not be turned into a [`Reading`]
#[derive(Debug, Clone, PartialEq)]
pub struct RejectedLine {
    /// 1-based line number within the fetched body
    pub line_number: usize,
    /// The raw line as received
    pub line: String,
    pub error: RowError,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_row() {
        let row = Reading::new(110.0, 7).to_row();
        assert_eq!(serde_json::to_string(&row).unwrap(), "[110.0,7]");
    }
}
