//! Text fieldtype

use super::{unsupported, Fieldtype, SCORE_PREFIX};
use crate::error::Result;
use crate::query::{escape_like, escape_string, SelectQuery, LIKE_ESCAPE};
use crate::selector::Operator;

/// Single or multi line text. `*=` ranks matches by how often the phrase
/// occurs.
pub struct TextFieldtype {
    name: &'static str,
}

impl TextFieldtype {
    pub fn text() -> Self {
        TextFieldtype { name: "text" }
    }

    pub fn textarea() -> Self {
        TextFieldtype { name: "textarea" }
    }
}

fn like(column: &str, pattern: &str) -> String {
    format!("{} LIKE '{}' ESCAPE '{}'", column, pattern, LIKE_ESCAPE)
}

impl Fieldtype for TextFieldtype {
    fn name(&self) -> &'static str {
        self.name
    }

    fn match_query(
        &self,
        query: &mut SelectQuery,
        table_alias: &str,
        column: &str,
        operator: Operator,
        value: &str,
    ) -> Result<()> {
        let target = format!("{}.{}", table_alias, column);

        match operator {
            Operator::ContainsPhrase => {
                let escaped = escape_string(value);
                query.where_(like(&target, &format!("%{}%", escape_like(&escaped))));

                if !value.is_empty() {
                    let score = format!("{}_{}_{}", SCORE_PREFIX, table_alias, column);
                    query.select(format!(
                        "(LENGTH({t})-LENGTH(REPLACE(LOWER({t}),LOWER('{v}'),'')))/LENGTH('{v}') AS {s}",
                        t = target,
                        v = escaped,
                        s = score,
                    ));
                    query.orderby(format!("{} DESC", score));
                }
            }
            Operator::ContainsWords => {
                for word in value.split_whitespace() {
                    let word = escape_like(&escape_string(word));
                    query.where_(like(&target, &format!("%{}%", word)));
                }
            }
            Operator::Like => {
                query.where_(format!("{} LIKE '{}'", target, escape_string(value)));
            }
            Operator::StartsWith => {
                let prefix = escape_like(&escape_string(value));
                query.where_(like(&target, &format!("{}%", prefix)));
            }
            Operator::EndsWith => {
                let suffix = escape_like(&escape_string(value));
                query.where_(like(&target, &format!("%{}", suffix)));
            }
            Operator::BitwiseAnd => return Err(unsupported(operator, table_alias, column)),
            _ => {
                let op = operator
                    .sql_comparison()
                    .ok_or_else(|| unsupported(operator, table_alias, column))?;
                query.where_(format!("{}{}'{}'", target, op, escape_string(value)));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FinderError;

    fn matched(operator: Operator, value: &str) -> SelectQuery {
        let mut query = SelectQuery::new();
        TextFieldtype::text()
            .match_query(&mut query, "field_title", "data", operator, value)
            .unwrap();
        query
    }

    #[test]
    fn test_equality() {
        let query = matched(Operator::Equal, "O'Hara");
        assert_eq!(query.wheres(), &["field_title.data='O''Hara'"]);
        assert!(query.selects().is_empty());
    }

    #[test]
    fn test_contains_phrase_scores() {
        let query = matched(Operator::ContainsPhrase, "50%");
        assert_eq!(query.wheres(), &["field_title.data LIKE '%50!%%' ESCAPE '!'"]);
        assert_eq!(query.selects().len(), 1);
        assert!(query.selects()[0].ends_with("AS _score_field_title_data"));
        assert_eq!(query.orderbys(), &["_score_field_title_data DESC"]);
    }

    #[test]
    fn test_contains_words() {
        let query = matched(Operator::ContainsWords, "red  bike");
        assert_eq!(query.wheres().len(), 2);
        assert_eq!(query.wheres()[1], "field_title.data LIKE '%bike%' ESCAPE '!'");
    }

    #[test]
    fn test_starts_and_ends_with() {
        assert_eq!(
            matched(Operator::StartsWith, "a_b").wheres(),
            &["field_title.data LIKE 'a!_b%' ESCAPE '!'"]
        );
        assert_eq!(
            matched(Operator::EndsWith, "z").wheres(),
            &["field_title.data LIKE '%z' ESCAPE '!'"]
        );
    }

    #[test]
    fn test_bitwise_rejected() {
        let mut query = SelectQuery::new();
        let err = TextFieldtype::text()
            .match_query(&mut query, "field_title", "data", Operator::BitwiseAnd, "1")
            .unwrap_err();
        assert!(matches!(err, FinderError::UnsupportedOperator { .. }));
    }
}
