//! List endpoint query handling: ordering and free-text search
//!

use sea_orm::sea_query::{Condition, Expr, Func, LikeExpr};
use sea_orm::{ColumnTrait, EntityTrait, Order, QueryOrder, Select};

/// One term of an `ordering` parameter.
#[derive(Copy, Clone, Debug)]
pub struct OrderKey<C> {
    pub column: C,
    pub descending: bool,
}

impl<C> OrderKey<C> {
    pub fn asc(column: C) -> Self {
        OrderKey {
            column,
            descending: false,
        }
    }

    pub fn desc(column: C) -> Self {
        OrderKey {
            column,
            descending: true,
        }
    }

    fn order(&self) -> Order {
        match self.descending {
            true => Order::Desc,
            false => Order::Asc,
        }
    }
}

/// Parses `ordering=name,-created_at` style values.
///
/// Unknown field names are dropped. When nothing usable remains, `default` is
/// used.
pub fn parse_ordering<C: Copy>(
    raw: Option<&str>,
    allowed: &[(&str, C)],
    default: OrderKey<C>,
) -> Vec<OrderKey<C>> {
    let keys: Vec<OrderKey<C>> = raw
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter_map(|term| {
            let (name, descending) = match term.strip_prefix('-') {
                Some(name) => (name, true),
                None => (term, false),
            };
            allowed
                .iter()
                .find(|(field, _)| *field == name)
                .map(|(_, column)| OrderKey {
                    column: *column,
                    descending,
                })
        })
        .collect();

    if keys.is_empty() {
        vec![default]
    } else {
        keys
    }
}

/// Applies the ordering, then breaks ties on `id` in the direction of the
/// first key so listings are stable.
pub fn apply_ordering<E>(
    mut select: Select<E>,
    keys: &[OrderKey<E::Column>],
    id: E::Column,
) -> Select<E>
where
    E: EntityTrait,
    E::Column: Copy,
{
    for key in keys {
        select = select.order_by(key.column, key.order());
    }
    let tiebreak = keys.first().map(OrderKey::order).unwrap_or(Order::Desc);
    select.order_by(id, tiebreak)
}

/// Splits a search value into lowercase terms on whitespace and commas.
pub fn search_terms(raw: &str) -> Vec<String> {
    raw.split(|c: char| c.is_whitespace() || c == ',')
        .filter(|term| !term.is_empty())
        .map(str::to_lowercase)
        .collect()
}

fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Every term has to appear, case-insensitively, in at least one of `columns`.
pub fn search_condition<C>(raw: Option<&str>, columns: &[C]) -> Option<Condition>
where
    C: ColumnTrait + Copy,
{
    let terms = search_terms(raw?);
    if terms.is_empty() {
        return None;
    }

    let mut all = Condition::all();
    for term in terms {
        let pattern = format!("%{}%", escape_like(&term));
        let mut any = Condition::any();
        for column in columns {
            any = any.add(
                Expr::expr(Func::lower(Expr::col(*column)))
                    .like(LikeExpr::new(pattern.clone()).escape('\\')),
            );
        }
        all = all.add(any);
    }
    Some(all)
}
