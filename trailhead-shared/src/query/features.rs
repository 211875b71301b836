/// The query-modifier chain
///
/// Each step reads the raw request parameters and refines the wrapped
/// [`ListQuery`]. Steps are independent and may be applied in any subset,
/// although list handlers always run all four in order.

use std::collections::BTreeMap;

use super::{Comparison, Condition, ListQuery, Projection, SortKey, DEFAULT_LIMIT};

/// Parameters consumed by the chain itself rather than filtered on
const RESERVED: [&str; 4] = ["page", "sort", "limit", "fields"];

/// Field excluded from list responses unless the client asks for it
const INTERNAL_FIELD: &str = "version";

const DEFAULT_SORT: &str = "createdAt";

#[derive(Debug, Clone)]
pub struct ApiFeatures {
    query: ListQuery,
    params: BTreeMap<String, String>,
}

impl ApiFeatures {
    pub fn new(query: ListQuery, params: BTreeMap<String, String>) -> Self {
        Self { query, params }
    }

    /// Turns every non-reserved parameter into a condition
    ///
    /// `field[gte]=5` style keys become range conditions; any other key is
    /// kept verbatim as an equality condition.
    pub fn filter(mut self) -> Self {
        for (key, value) in &self.params {
            if RESERVED.contains(&key.as_str()) {
                continue;
            }

            let (field, op) = split_operator(key);
            self.query.conditions.push(Condition {
                field: field.to_string(),
                op,
                value: value.clone(),
            });
        }
        self
    }

    /// `sort=price,-ratingsAverage`; newest first by default
    pub fn sort(mut self) -> Self {
        let keys: Vec<SortKey> = self
            .params
            .get("sort")
            .map(|raw| comma_list(raw).map(sort_key).collect())
            .unwrap_or_default();

        self.query.sort = if keys.is_empty() {
            vec![SortKey {
                field: DEFAULT_SORT.to_string(),
                descending: true,
            }]
        } else {
            keys
        };
        self
    }

    /// `fields=name,price` selects; `fields=-summary` deselects
    pub fn limit_fields(mut self) -> Self {
        let fields: Vec<&str> = self
            .params
            .get("fields")
            .map(|raw| comma_list(raw).collect())
            .unwrap_or_default();

        self.query.projection = if fields.is_empty() {
            Projection::Exclude(vec![INTERNAL_FIELD.to_string()])
        } else if fields.iter().all(|f| f.starts_with('-')) {
            Projection::Exclude(fields.iter().map(|f| f[1..].to_string()).collect())
        } else {
            Projection::Include(
                fields
                    .iter()
                    .filter(|f| !f.starts_with('-'))
                    .map(|f| f.to_string())
                    .collect(),
            )
        };
        self
    }

    /// `page` and `limit`, both defaulting when absent or not a positive integer
    pub fn paginate(mut self) -> Self {
        let page = positive(self.params.get("page")).unwrap_or(1);
        let limit = positive(self.params.get("limit")).unwrap_or(DEFAULT_LIMIT);

        self.query.skip = (page - 1).saturating_mul(limit);
        self.query.limit = limit;
        self
    }

    pub fn into_query(self) -> ListQuery {
        self.query
    }
}

fn split_operator(key: &str) -> (&str, Comparison) {
    if let Some(stripped) = key.strip_suffix(']') {
        if let Some((field, token)) = stripped.split_once('[') {
            if let Some(op) = Comparison::from_token(token) {
                return (field, op);
            }
        }
    }
    (key, Comparison::Eq)
}

fn comma_list(raw: &str) -> impl Iterator<Item = &str> {
    raw.split(',').map(str::trim).filter(|part| !part.is_empty())
}

fn sort_key(part: &str) -> SortKey {
    match part.strip_prefix('-') {
        Some(field) => SortKey {
            field: field.to_string(),
            descending: true,
        },
        None => SortKey {
            field: part.to_string(),
            descending: false,
        },
    }
}

fn positive(raw: Option<&String>) -> Option<u64> {
    raw.and_then(|value| value.trim().parse::<u64>().ok())
        .filter(|value| *value > 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn run(pairs: &[(&str, &str)]) -> ListQuery {
        ApiFeatures::new(ListQuery::default(), params(pairs))
            .filter()
            .sort()
            .limit_fields()
            .paginate()
            .into_query()
    }

    #[test]
    fn test_filter_translates_range_tokens() {
        let query = run(&[
            ("duration[gte]", "5"),
            ("price[lt]", "1500"),
            ("ratingsAverage[gt]", "4"),
            ("maxGroupSize[lte]", "10"),
        ]);

        let ops: Vec<(&str, Comparison)> = query
            .conditions
            .iter()
            .map(|c| (c.field.as_str(), c.op))
            .collect();

        assert!(ops.contains(&("duration", Comparison::Gte)));
        assert!(ops.contains(&("price", Comparison::Lt)));
        assert!(ops.contains(&("ratingsAverage", Comparison::Gt)));
        assert!(ops.contains(&("maxGroupSize", Comparison::Lte)));
    }

    #[test]
    fn test_filter_leaves_other_keys_untouched() {
        let query = run(&[("difficulty", "easy"), ("duration[ne]", "5")]);

        assert_eq!(
            query.conditions,
            vec![
                Condition {
                    field: "difficulty".to_string(),
                    op: Comparison::Eq,
                    value: "easy".to_string(),
                },
                Condition {
                    field: "duration[ne]".to_string(),
                    op: Comparison::Eq,
                    value: "5".to_string(),
                },
            ]
        );
    }

    #[test]
    fn test_filter_skips_reserved_parameters() {
        let query = run(&[("page", "2"), ("sort", "price"), ("limit", "3"), ("fields", "name")]);
        assert!(query.conditions.is_empty());
    }

    #[test]
    fn test_filter_keeps_base_conditions() {
        let base = ListQuery::scoped("tour", "5c88fa8cf4afda39709c2955");
        let query = ApiFeatures::new(base, params(&[("rating", "5")]))
            .filter()
            .into_query();

        assert_eq!(query.conditions.len(), 2);
        assert_eq!(query.conditions[0].field, "tour");
    }

    #[test]
    fn test_sort_defaults_to_newest_first() {
        let query = run(&[]);
        assert_eq!(
            query.sort,
            vec![SortKey {
                field: "createdAt".to_string(),
                descending: true
            }]
        );
    }

    #[test]
    fn test_sort_parses_multiple_keys() {
        let query = run(&[("sort", "-ratingsAverage, price")]);
        assert_eq!(
            query.sort,
            vec![
                SortKey {
                    field: "ratingsAverage".to_string(),
                    descending: true
                },
                SortKey {
                    field: "price".to_string(),
                    descending: false
                },
            ]
        );
    }

    #[test]
    fn test_limit_fields() {
        assert_eq!(
            run(&[]).projection,
            Projection::Exclude(vec!["version".to_string()])
        );
        assert_eq!(
            run(&[("fields", "name,price")]).projection,
            Projection::Include(vec!["name".to_string(), "price".to_string()])
        );
        assert_eq!(
            run(&[("fields", "-summary,-description")]).projection,
            Projection::Exclude(vec!["summary".to_string(), "description".to_string()])
        );
    }

    #[test]
    fn test_paginate_defaults() {
        let query = run(&[]);
        assert_eq!(query.skip, 0);
        assert_eq!(query.limit, 100);
    }

    #[test]
    fn test_paginate_page_three_of_ten() {
        let query = run(&[("page", "3"), ("limit", "10")]);
        assert_eq!(query.skip, 20);
        assert_eq!(query.limit, 10);
    }

    #[test]
    fn test_paginate_ignores_malformed_numbers() {
        let query = run(&[("page", "0"), ("limit", "-4")]);
        assert_eq!(query.skip, 0);
        assert_eq!(query.limit, 100);

        let query = run(&[("page", "two")]);
        assert_eq!(query.skip, 0);
    }
}
