//! The authoring store: a pure state machine driven by [`Command`]s.

use std::collections::BTreeMap;
use std::sync::Arc;

use log::*;

use crate::data::PublishedItinerary;
use crate::error::AssociationWarning;
use crate::geo::{Feature, FeatureCollection};

mod command;
mod reducers;

pub use command::Command;
pub use reducers::{DestinationMap, PropertiesMap, Sequence};

/// Complete authoring state. Collections sit behind `Arc` so that a slice a
/// command did not touch is the very same allocation in the next state.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AuthorState {
    pub title: String,
    pub description: String,
    pub sequence: Sequence,
    pub destinations: DestinationMap,
    pub properties: PropertiesMap,
    pub image_sources: Arc<Vec<String>>,
    pub error: Option<String>,
    pub focused_destination_id: Option<String>,
    pub show_nearby: bool,
    pub nearby_pois: Option<Arc<FeatureCollection>>,
    pub selected_pois: Arc<Vec<Feature>>,
    pub output: Option<Arc<PublishedItinerary>>,
}

/// Computes the state following `command`, plus any association warnings it raised.
pub fn reduce(state: &AuthorState, command: &Command) -> (AuthorState, Vec<AssociationWarning>) {
    let mut warnings = Vec::new();
    let mut next = AuthorState {
        title: reducers::title(&state.title, command),
        description: reducers::description(&state.description, command),
        sequence: reducers::sequence(&state.sequence, command),
        destinations: reducers::destinations(&state.destinations, command),
        properties: reducers::properties(&state.properties, command, &mut warnings),
        image_sources: reducers::image_sources(&state.image_sources, command),
        error: reducers::error(&state.error, command),
        focused_destination_id: reducers::focused_destination(
            &state.focused_destination_id,
            command,
        ),
        show_nearby: reducers::show_nearby(state.show_nearby, command),
        nearby_pois: reducers::nearby_pois(&state.nearby_pois, command),
        selected_pois: reducers::selected_pois(&state.selected_pois, command),
        output: reducers::output(&state.output, command),
    };
    release_removed_focus(state, &mut next);
    require_focus_for_nearby(&mut next);
    reconcile_selected_pois(state, &mut next);
    (next, warnings)
}

/// Focus on a stop that has just left the itinerary is dropped.
fn release_removed_focus(previous: &AuthorState, next: &mut AuthorState) {
    let removed = next.focused_destination_id.as_ref().is_some_and(|id| {
        previous.destinations.contains_key(id) && !next.destinations.contains_key(id)
    });
    if removed {
        next.focused_destination_id = None;
    }
}

/// Nearby search is only shown while some stop is focused.
fn require_focus_for_nearby(next: &mut AuthorState) {
    if next.focused_destination_id.is_none() {
        next.show_nearby = false;
    }
}

/// Keeps each highlighted POI at most as often as the stops list it.
fn reconcile_selected_pois(previous: &AuthorState, next: &mut AuthorState) {
    if Arc::ptr_eq(&previous.properties, &next.properties)
        && Arc::ptr_eq(&previous.selected_pois, &next.selected_pois)
    {
        return;
    }
    let mut listed: BTreeMap<&str, usize> = BTreeMap::new();
    for poi in next.properties.values().flat_map(|properties| properties.pois.iter()) {
        *listed.entry(poi.id.as_str()).or_default() += 1;
    }
    let kept: Vec<Feature> = next
        .selected_pois
        .iter()
        .filter(|feature| {
            let Some(id) = feature.id_text() else {
                return false;
            };
            match listed.get_mut(id.as_str()) {
                Some(count) if *count > 0 => {
                    *count -= 1;
                    true
                }
                _ => false,
            }
        })
        .cloned()
        .collect();
    if kept.len() == next.selected_pois.len() {
        return;
    }
    next.selected_pois = if kept == *previous.selected_pois {
        Arc::clone(&previous.selected_pois)
    } else {
        Arc::new(kept)
    };
}

/// Single writer over an [`AuthorState`]. Commands are applied one at a time,
/// in the order they are dispatched.
#[derive(Debug, Default)]
pub struct Store {
    state: AuthorState,
}

impl Store {
    pub fn new() -> Self {
        Store::default()
    }

    pub fn state(&self) -> &AuthorState {
        &self.state
    }

    /// Applies `command`. Association warnings are logged and handed back;
    /// they never prevent the command from completing.
    pub fn dispatch(&mut self, command: Command) -> Vec<AssociationWarning> {
        trace!("Reducing {}.", command.name());
        let (next, warnings) = reduce(&self.state, &command);
        for warning in &warnings {
            warn!("{}", warning);
        }
        self.state = next;
        warnings
    }
}
