//! One reducer per slice of [`AuthorState`](super::AuthorState).
//!
//! Each receives only its own slice and the command. A command a reducer does
//! not act on returns the same `Arc`, so unaffected slices keep their identity.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::data::{Destination, DestinationProperties, PublishedItinerary};
use crate::error::AssociationWarning;
use crate::geo::{Feature, FeatureCollection};

use super::Command;

pub type Sequence = Arc<Vec<String>>;
pub type DestinationMap = Arc<BTreeMap<String, Destination>>;
pub type PropertiesMap = Arc<BTreeMap<String, DestinationProperties>>;

pub(super) fn sequence(state: &Sequence, command: &Command) -> Sequence {
    match command {
        Command::AddBaseItinerary(stops) => {
            Arc::new(stops.iter().map(|stop| stop.id.clone()).collect())
        }
        Command::InsertDestination {
            destination,
            position,
        } => {
            let mut next: Vec<String> = state
                .iter()
                .filter(|id| **id != destination.id)
                .cloned()
                .collect();
            let position = (*position).min(next.len());
            next.insert(position, destination.id.clone());
            Arc::new(next)
        }
        Command::RemoveDestination { id } if state.contains(id) => {
            Arc::new(state.iter().filter(|seq_id| *seq_id != id).cloned().collect())
        }
        _ => Arc::clone(state),
    }
}

pub(super) fn destinations(state: &DestinationMap, command: &Command) -> DestinationMap {
    match command {
        Command::AddBaseItinerary(stops) => Arc::new(
            stops
                .iter()
                .map(|stop| (stop.id.clone(), stop.clone()))
                .collect(),
        ),
        Command::InsertDestination { destination, .. } => {
            let mut next = (**state).clone();
            next.insert(destination.id.clone(), destination.clone());
            Arc::new(next)
        }
        Command::RemoveDestination { id } if state.contains_key(id) => {
            let mut next = (**state).clone();
            next.remove(id);
            Arc::new(next)
        }
        _ => Arc::clone(state),
    }
}

/// Applies `edit` to a copy of the record for `id`, or reports the stop as missing.
fn edit_properties(
    state: &PropertiesMap,
    command: &Command,
    id: &str,
    warnings: &mut Vec<AssociationWarning>,
    edit: impl FnOnce(&mut DestinationProperties) -> Result<bool, AssociationWarning>,
) -> PropertiesMap {
    let Some(current) = state.get(id) else {
        warnings.push(AssociationWarning::MissingStop {
            command: command.name(),
            id: id.to_owned(),
        });
        return Arc::clone(state);
    };
    let mut record = current.clone();
    match edit(&mut record) {
        Ok(true) => {
            let mut next = (**state).clone();
            next.insert(id.to_owned(), record);
            Arc::new(next)
        }
        Ok(false) => Arc::clone(state),
        Err(warning) => {
            warnings.push(warning);
            Arc::clone(state)
        }
    }
}

pub(super) fn properties(
    state: &PropertiesMap,
    command: &Command,
    warnings: &mut Vec<AssociationWarning>,
) -> PropertiesMap {
    match command {
        Command::AddBaseItinerary(stops) => Arc::new(
            stops
                .iter()
                .map(|stop| (stop.id.clone(), DestinationProperties::default()))
                .collect(),
        ),
        Command::InsertDestination { destination, .. } if !state.contains_key(&destination.id) => {
            let mut next = (**state).clone();
            next.insert(destination.id.clone(), DestinationProperties::default());
            Arc::new(next)
        }
        Command::RemoveDestination { id } if state.contains_key(id) => {
            let mut next = (**state).clone();
            next.remove(id);
            Arc::new(next)
        }
        Command::AddDestinationProperty { id, key, value } => {
            edit_properties(state, command, id, warnings, |record| {
                if record.set(key, value) {
                    Ok(true)
                } else {
                    Err(AssociationWarning::RejectedValue {
                        id: id.clone(),
                        key: key.clone(),
                    })
                }
            })
        }
        Command::AddDestinationPoi { id, poi } => {
            edit_properties(state, command, id, warnings, |record| {
                record.pois.push(poi.clone());
                Ok(true)
            })
        }
        Command::RemoveDestinationPoi { id, poi_id } => {
            edit_properties(state, command, id, warnings, |record| {
                let before = record.pois.len();
                record.pois.retain(|poi| poi.id != *poi_id);
                Ok(record.pois.len() != before)
            })
        }
        Command::AssignDestinationImage { id, url } => {
            edit_properties(state, command, id, warnings, |record| {
                record.image_url = Some(url.clone());
                Ok(true)
            })
        }
        _ => Arc::clone(state),
    }
}

pub(super) fn image_sources(state: &Arc<Vec<String>>, command: &Command) -> Arc<Vec<String>> {
    match command {
        Command::AddImageSources(sources) => Arc::new(sources.clone()),
        _ => Arc::clone(state),
    }
}

pub(super) fn error(state: &Option<String>, command: &Command) -> Option<String> {
    match command {
        Command::AddError(message) => Some(message.clone()),
        Command::ClearErrors => None,
        _ => state.clone(),
    }
}

pub(super) fn output(
    state: &Option<Arc<PublishedItinerary>>,
    command: &Command,
) -> Option<Arc<PublishedItinerary>> {
    match command {
        Command::SaveOutputItinerary(itinerary) => Some(Arc::new(itinerary.clone())),
        _ => state.clone(),
    }
}

pub(super) fn title(state: &str, command: &Command) -> String {
    match command {
        Command::SetItineraryTitle(title) => title.clone(),
        _ => state.to_owned(),
    }
}

pub(super) fn description(state: &str, command: &Command) -> String {
    match command {
        Command::SetItineraryDescription(description) => description.clone(),
        _ => state.to_owned(),
    }
}

pub(super) fn focused_destination(state: &Option<String>, command: &Command) -> Option<String> {
    match command {
        Command::SetFocusedDestination { id, focused: true } => Some(id.clone()),
        Command::SetFocusedDestination { focused: false, .. } => None,
        _ => state.clone(),
    }
}

pub(super) fn show_nearby(state: bool, command: &Command) -> bool {
    match command {
        Command::ShowNearbyPois(show) => *show,
        _ => state,
    }
}

pub(super) fn nearby_pois(
    state: &Option<Arc<FeatureCollection>>,
    command: &Command,
) -> Option<Arc<FeatureCollection>> {
    match command {
        Command::SetNearbyPois(pois) => Some(Arc::new(pois.clone())),
        _ => state.clone(),
    }
}

pub(super) fn selected_pois(state: &Arc<Vec<Feature>>, command: &Command) -> Arc<Vec<Feature>> {
    match command {
        Command::AddDestinationPoi { poi, .. } => {
            let mut next = (**state).clone();
            next.push(poi.to_feature());
            Arc::new(next)
        }
        _ => Arc::clone(state),
    }
}
