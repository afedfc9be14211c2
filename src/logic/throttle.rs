use crate::error::Result;
use crate::model::Payload;
use crate::store::RecordClass;

/// Read every schema field of one record in slices of at most `batch_size`
/// selected fields.
///
/// Works around the server refusing single-record fetches that select too
/// many fields. Each slice is a one-row query that always selects `id`, so
/// `id` counts against every slice; the rows are merged.
pub fn fetch_in_batches(class: &RecordClass<'_>, id: &str, batch_size: usize) -> Result<Payload> {
    let field_names: Vec<String> = class
        .describe()?
        .field_names()
        .into_iter()
        .filter(|name| name != "id")
        .collect();
    let per_slice = batch_size.saturating_sub(1).max(1);
    log::debug!(
        "reading {}:{} in {} slices",
        class.name(),
        id,
        field_names.len().div_ceil(per_slice)
    );

    let slices = field_names
        .chunks(per_slice)
        .map(|batch| class.fetch_row(id, batch))
        .collect::<Result<Vec<_>>>()?;
    Ok(merge_slices(slices))
}

/// Merge per-slice rows of the same record. Later slices overwrite
/// earlier values, except `attributes`, which is kept from the first slice.
pub fn merge_slices<I>(slices: I) -> Payload
where
    I: IntoIterator<Item = Payload>,
{
    let mut merged = Payload::new();
    for slice in slices {
        for (key, value) in slice {
            if key == "attributes" && merged.contains_key("attributes") {
                continue;
            }
            merged.insert(key, value);
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::FieldValue;
    use crate::store::{Method, Response};
    use crate::test_support::{test_client, MockTransport};
    use serde_json::json;

    fn payload(value: serde_json::Value) -> Payload {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_merge_three_slices() {
        let merged = merge_slices([
            payload(json!({"attributes": {"type": "Opportunity", "url": "/first"}, "Id": "006A", "Name": "Big Deal"})),
            payload(json!({"attributes": {"type": "Opportunity", "url": "/second"}, "Id": "006A", "Amount": 10})),
            payload(json!({"attributes": {"type": "Opportunity"}, "Id": "006A", "CloseDate": "2024-01-15"})),
        ]);
        assert_eq!(merged.len(), 5);
        assert_eq!(merged["attributes"]["url"], json!("/first"));
        assert_eq!(merged["Name"], json!("Big Deal"));
        assert_eq!(merged["Amount"], json!(10));
        assert_eq!(merged["CloseDate"], json!("2024-01-15"));
    }

    #[test]
    fn test_find_throttled_batches_fields() {
        let mock = MockTransport::new();
        let row = |fields: serde_json::Value| {
            let mut body = json!({"attributes": {"type": "Opportunity", "url": "/services/data/v58.0/sobjects/Opportunity/006A"}, "Id": "006A"});
            for (k, v) in fields.as_object().unwrap() {
                body[k] = v.clone();
            }
            Response::new(
                200,
                json!({"totalSize": 1, "done": true, "records": [body]}).to_string(),
            )
        };
        // Opportunity test schema order: id, name, amount, closedate, stagename,
        // accountid, iswon, lastmodifieddate. Three selected fields per slice,
        // id included.
        mock.expect_query(
            "SELECT id, name, amount FROM Opportunity WHERE id = '006A' LIMIT 1",
            row(json!({"Name": "Big Deal", "Amount": 10})),
        );
        mock.expect_query(
            "SELECT id, closedate, stagename FROM Opportunity",
            row(json!({"CloseDate": "2024-01-15", "StageName": "Prospecting"})),
        );
        mock.expect_query(
            "SELECT id, accountid, iswon FROM Opportunity",
            row(json!({"AccountId": "001A", "IsWon": false})),
        );
        mock.expect_query(
            "SELECT id, lastmodifieddate FROM Opportunity",
            row(json!({"LastModifiedDate": "2024-01-16T09:00:00.000+0000"})),
        );

        let client = test_client(&mock).with_throttle_batch_size(3);
        let record = client
            .sobject("Opportunity")
            .unwrap()
            .find_throttled("006A")
            .unwrap();

        assert_eq!(mock.count(Method::Get, "/query"), 4);
        assert!(mock.requests().iter().all(|r| {
            r.params
                .iter()
                .all(|(_, soql)| soql.split(" FROM ").next().unwrap().split(", ").count() <= 3)
        }));
        assert_eq!(record.id(), Some("006A"));
        assert_eq!(record.field("name").and_then(FieldValue::as_str), Some("Big Deal"));
        assert_eq!(record.field("accountid").and_then(FieldValue::as_str), Some("001A"));
        assert!(record.field("closedate").and_then(FieldValue::as_timestamp).is_some());
        assert!(record
            .field("lastmodifieddate")
            .and_then(FieldValue::as_timestamp)
            .is_some());
    }
}
