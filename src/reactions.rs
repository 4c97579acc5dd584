//! Grouping of a message's reactions by symbol.

use crate::conversation::Reaction;
use serde::Serialize;

/// Distinct actors that reacted with one symbol, in first-seen order
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReactionGroup {
    pub reaction: String,
    pub actors: Vec<String>,
}

/// Group actors by reaction symbol.
///
/// Symbols keep first-seen order, as do actors within a symbol. An actor is
/// listed once per symbol but may appear under several symbols.
pub fn group_actors_by_reaction(reactions: &[Reaction]) -> Vec<ReactionGroup> {
    let mut groups: Vec<ReactionGroup> = Vec::new();

    for r in reactions {
        match groups.iter_mut().find(|g| g.reaction == r.reaction) {
            Some(group) => {
                if !group.actors.contains(&r.actor) {
                    group.actors.push(r.actor.clone());
                }
            }
            None => groups.push(ReactionGroup {
                reaction: r.reaction.clone(),
                actors: vec![r.actor.clone()],
            }),
        }
    }

    groups
}
