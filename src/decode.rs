use std::fmt;
use std::io::Read;

use serde::de::{self, DeserializeSeed, Deserializer, IgnoredAny, MapAccess, SeqAccess, Visitor};
use serde::Deserialize;

use crate::error::{IndexError, Result};

/// Top-level field holding the record array in a Transparency-in-Coverage
/// index document.
pub const REPORTING_FIELD: &str = "reporting_structure";

/// One element of the reporting array: the plans a payer reports under and
/// the machine-readable files published for them.
///
/// Both collections default to empty when the field is absent, so a record
/// missing either list decodes cleanly and is evaluated like any other.
#[derive(Debug, Default, Deserialize)]
pub struct ReportingRecord {
    #[serde(default)]
    pub reporting_plans: Vec<ReportingPlan>,
    #[serde(default)]
    pub in_network_files: Vec<InNetworkFile>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ReportingPlan {
    #[serde(default)]
    pub plan_name: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct InNetworkFile {
    #[serde(default)]
    pub location: String,
}

/// Stream the reporting records out of an index document.
///
/// Walks the top-level object field by field. Every field except
/// [`REPORTING_FIELD`] is consumed and discarded without being materialized;
/// the target field's array is decoded one element at a time, each
/// [`ReportingRecord`] handed to `on_record` and dropped before the next
/// element is read. Memory stays bounded to one record regardless of
/// document size. Single forward pass over the input; not restartable.
///
/// Returns the number of records traversed.
///
/// Structural errors (malformed tokens, a non-object top level, a non-array
/// target field, truncated input) abort the traversal. An error returned by
/// `on_record` also aborts it and is reported as an output failure rather
/// than a decode failure.
pub fn stream_records<R, F>(reader: R, mut on_record: F) -> Result<u64>
where
    R: Read,
    F: FnMut(ReportingRecord) -> std::io::Result<()>,
{
    let mut consumer_error: Option<std::io::Error> = None;
    let mut deserializer = serde_json::Deserializer::from_reader(reader);

    let seed = DocumentSeed {
        on_record: &mut on_record,
        consumer_error: &mut consumer_error,
    };

    match seed.deserialize(&mut deserializer) {
        Ok(records) => Ok(records),
        // When the consumer failed, the serde error is only the bail-out
        // vehicle; surface the original I/O error instead.
        Err(err) => match consumer_error {
            Some(io_err) => Err(IndexError::Output(io_err)),
            None => Err(IndexError::Decode(err)),
        },
    }
}

/// Seed for the top-level index object.
struct DocumentSeed<'a, F> {
    on_record: &'a mut F,
    consumer_error: &'a mut Option<std::io::Error>,
}

impl<'de, 'a, F> DeserializeSeed<'de> for DocumentSeed<'a, F>
where
    F: FnMut(ReportingRecord) -> std::io::Result<()>,
{
    type Value = u64;

    fn deserialize<D>(self, deserializer: D) -> std::result::Result<u64, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_map(self)
    }
}

impl<'de, 'a, F> Visitor<'de> for DocumentSeed<'a, F>
where
    F: FnMut(ReportingRecord) -> std::io::Result<()>,
{
    type Value = u64;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a top-level index object")
    }

    fn visit_map<A>(self, mut map: A) -> std::result::Result<u64, A::Error>
    where
        A: MapAccess<'de>,
    {
        let mut records = 0u64;

        while let Some(field) = map.next_key::<String>()? {
            if field == REPORTING_FIELD {
                records += map.next_value_seed(RecordArraySeed {
                    on_record: &mut *self.on_record,
                    consumer_error: &mut *self.consumer_error,
                })?;
            } else {
                map.next_value::<IgnoredAny>()?;
            }
        }

        Ok(records)
    }
}

/// Seed for the reporting array itself.
struct RecordArraySeed<'a, F> {
    on_record: &'a mut F,
    consumer_error: &'a mut Option<std::io::Error>,
}

impl<'de, 'a, F> DeserializeSeed<'de> for RecordArraySeed<'a, F>
where
    F: FnMut(ReportingRecord) -> std::io::Result<()>,
{
    type Value = u64;

    fn deserialize<D>(self, deserializer: D) -> std::result::Result<u64, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_seq(self)
    }
}

impl<'de, 'a, F> Visitor<'de> for RecordArraySeed<'a, F>
where
    F: FnMut(ReportingRecord) -> std::io::Result<()>,
{
    type Value = u64;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("an array of reporting records")
    }

    fn visit_seq<A>(self, mut seq: A) -> std::result::Result<u64, A::Error>
    where
        A: SeqAccess<'de>,
    {
        let mut records = 0u64;

        while let Some(record) = seq.next_element::<ReportingRecord>()? {
            records += 1;
            if let Err(err) = (self.on_record)(record) {
                *self.consumer_error = Some(err);
                return Err(de::Error::custom("record consumer failed"));
            }
        }

        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect(input: &str) -> Result<Vec<ReportingRecord>> {
        let mut records = Vec::new();
        stream_records(input.as_bytes(), |record| {
            records.push(record);
            Ok(())
        })?;
        Ok(records)
    }

    #[test]
    fn decodes_records_in_document_order() {
        let input = r#"{
            "reporting_structure": [
                {
                    "reporting_plans": [{"plan_name": "Anthem PPO New York"}],
                    "in_network_files": [{"location": "anthem/NY/a.json"}]
                },
                {
                    "reporting_plans": [
                        {"plan_name": "Anthem HMO California"},
                        {"plan_name": "Anthem EPO Maine"}
                    ],
                    "in_network_files": [
                        {"location": "anthem/CA/b.json"},
                        {"location": "anthem/CA/c.json"}
                    ]
                }
            ]
        }"#;

        let records = collect(input).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].reporting_plans[0].plan_name, "Anthem PPO New York");
        assert_eq!(records[0].in_network_files[0].location, "anthem/NY/a.json");
        assert_eq!(records[1].reporting_plans.len(), 2);
        assert_eq!(records[1].in_network_files[1].location, "anthem/CA/c.json");
    }

    #[test]
    fn skips_unrelated_fields_around_the_target() {
        let input = r#"{
            "reporting_entity_name": "Anthem Inc",
            "reporting_entity_type": "health insurance issuer",
            "metadata": {"version": "1.0", "nested": [1, 2, {"deep": true}]},
            "reporting_structure": [
                {"in_network_files": [{"location": "anthem/NY/a.json"}]}
            ],
            "trailing_note": null
        }"#;

        let records = collect(input).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].in_network_files[0].location, "anthem/NY/a.json");
    }

    #[test]
    fn absent_sub_fields_decode_as_empty() {
        let input = r#"{
            "reporting_structure": [
                {},
                {"reporting_plans": [{"plan_name": "Anthem PPO New York"}]},
                {"in_network_files": [{"location": "anthem/NY/a.json"}]}
            ]
        }"#;

        let records = collect(input).unwrap();
        assert_eq!(records.len(), 3);
        assert!(records[0].reporting_plans.is_empty());
        assert!(records[0].in_network_files.is_empty());
        assert!(records[1].in_network_files.is_empty());
        assert!(records[2].reporting_plans.is_empty());
    }

    #[test]
    fn unknown_record_fields_are_ignored() {
        let input = r#"{
            "reporting_structure": [
                {
                    "reporting_plans": [{"plan_name": "Anthem PPO New York", "plan_id": "123"}],
                    "in_network_files": [{"location": "anthem/NY/a.json", "description": "rates"}],
                    "extra": {"anything": [true]}
                }
            ]
        }"#;

        let records = collect(input).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].reporting_plans[0].plan_name, "Anthem PPO New York");
    }

    #[test]
    fn document_without_target_field_yields_no_records() {
        let records = collect(r#"{"reporting_entity_name": "Anthem Inc"}"#).unwrap();
        assert!(records.is_empty());
    }

    #[test]
    fn truncated_document_is_a_decode_error() {
        let input = r#"{"reporting_structure": [{"in_network_files": [{"location": "a"#;
        assert!(matches!(collect(input), Err(IndexError::Decode(_))));
    }

    #[test]
    fn non_object_top_level_is_a_decode_error() {
        assert!(matches!(collect("[]"), Err(IndexError::Decode(_))));
        assert!(matches!(collect("42"), Err(IndexError::Decode(_))));
    }

    #[test]
    fn non_array_target_field_is_a_decode_error() {
        let input = r#"{"reporting_structure": {"not": "an array"}}"#;
        assert!(matches!(collect(input), Err(IndexError::Decode(_))));
    }

    #[test]
    fn consumer_error_aborts_and_is_reported_as_output_failure() {
        let input = r#"{
            "reporting_structure": [
                {"in_network_files": [{"location": "anthem/NY/a.json"}]},
                {"in_network_files": [{"location": "anthem/NY/b.json"}]}
            ]
        }"#;

        let mut seen = 0;
        let result = stream_records(input.as_bytes(), |_| {
            seen += 1;
            Err(std::io::Error::new(std::io::ErrorKind::WriteZero, "disk full"))
        });

        assert_eq!(seen, 1);
        assert!(matches!(result, Err(IndexError::Output(_))));
    }

    #[test]
    fn repeated_target_field_is_traversed_each_time() {
        let input = r#"{
            "reporting_structure": [{"in_network_files": [{"location": "a"}]}],
            "reporting_structure": [{"in_network_files": [{"location": "b"}]}]
        }"#;

        let records = collect(input).unwrap();
        assert_eq!(records.len(), 2);
    }

    #[test]
    fn returns_record_count() {
        let input = r#"{"reporting_structure": [{}, {}, {}]}"#;
        let mut calls = 0;
        let count = stream_records(input.as_bytes(), |_| {
            calls += 1;
            Ok(())
        })
        .unwrap();
        assert_eq!(count, 3);
        assert_eq!(calls, 3);
    }
}
