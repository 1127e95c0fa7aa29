//! Client-side predicates over [`Item`].
//!
//! Sources accept filter hints, but the server may ignore any of them, so
//! every command re-applies each hint it sends, plus its own filters, here.
//! A [`FilterChain`] is the logical AND of its predicates; an item lacking the
//! attribute a predicate inspects does not match it.

use crate::models::{Item, Location};
use chrono::{DateTime, Utc};
use itertools::Itertools;
use std::fmt;
use tracing::debug;

/// One pure test over an item.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// Item carries this tag.
    HasTag(String),
    /// Item does not carry this tag yet. Keeps tagging sweeps idempotent.
    LacksTag(String),
    /// Item category is one of these.
    CategoryIn(Vec<String>),
    /// Item sits in one of these locations.
    LocationIn(Vec<Location>),
    /// Created at or after the instant.
    CreatedAfter(DateTime<Utc>),
    /// Updated at or after the instant.
    UpdatedAfter(DateTime<Utc>),
}

impl Predicate {
    pub fn matches(&self, item: &Item) -> bool {
        match self {
            Predicate::HasTag(tag) => item.has_tag(tag),
            Predicate::LacksTag(tag) => !item.has_tag(tag),
            Predicate::CategoryIn(categories) => item
                .category
                .as_ref()
                .is_some_and(|c| categories.iter().any(|want| want == c)),
            Predicate::LocationIn(locations) => item.location.is_some_and(|l| locations.contains(&l)),
            Predicate::CreatedAfter(cutoff) => match item.created_at {
                Some(created) => created >= *cutoff,
                None => {
                    debug!(title = %item.display_title(), "Item has no creation timestamp");
                    false
                }
            },
            Predicate::UpdatedAfter(cutoff) => item.updated_at.is_some_and(|u| u >= *cutoff),
        }
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Predicate::HasTag(tag) => write!(f, "has tag '{tag}'"),
            Predicate::LacksTag(tag) => write!(f, "lacks tag '{tag}'"),
            Predicate::CategoryIn(c) => write!(f, "category in [{}]", c.join(", ")),
            Predicate::LocationIn(l) => write!(f, "location in [{}]", l.iter().join(", ")),
            Predicate::CreatedAfter(t) => write!(f, "created after {}", t.to_rfc3339()),
            Predicate::UpdatedAfter(t) => write!(f, "updated after {}", t.to_rfc3339()),
        }
    }
}

/// An ordered AND of predicates.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterChain {
    predicates: Vec<Predicate>,
}

impl FilterChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a predicate.
    pub fn with(mut self, predicate: Predicate) -> Self {
        self.predicates.push(predicate);
        self
    }

    /// Append a predicate when one is given.
    pub fn with_opt(self, predicate: Option<Predicate>) -> Self {
        match predicate {
            Some(p) => self.with(p),
            None => self,
        }
    }

    pub fn matches(&self, item: &Item) -> bool {
        self.predicates.iter().all(|p| p.matches(item))
    }

    /// Keep the items matching every predicate, in their original order.
    pub fn apply(&self, items: Vec<Item>) -> Vec<Item> {
        self.apply_tallied(items).0
    }

    /// Like [`FilterChain::apply`], also returning how many items each
    /// predicate removed.
    pub fn apply_tallied(&self, mut items: Vec<Item>) -> (Vec<Item>, Vec<(Predicate, usize)>) {
        let mut removed = Vec::with_capacity(self.predicates.len());
        for predicate in &self.predicates {
            let before = items.len();
            items.retain(|item| predicate.matches(item));
            debug!(
                %predicate,
                before,
                after = items.len(),
                "Applied filter"
            );
            removed.push((predicate.clone(), before - items.len()));
        }
        (items, removed)
    }
}
