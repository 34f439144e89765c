//! Derived views of the authoring state.
//!
//! Selectors are memoized on the identity of their inputs: a cached result is
//! reused for as long as every tracked `Arc` is the same allocation.

use std::collections::BTreeMap;
use std::sync::Arc;

use log::*;
use serde_json::{Map, Value};

use crate::data::{
    Destination, DestinationProperties, DestinationWithProperties, Poi, PublishedItinerary,
};
use crate::geo::{great_circle, Bounds, Feature, FeatureCollection, LngLat, ARC_POINTS};
use crate::store::{AuthorState, DestinationMap, Sequence};

/// Route geometry for the current stop order.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteProjection {
    /// One point per stop, with `title` and `id` properties, in sequence order.
    pub stops: FeatureCollection,
    /// One great-circle arc per consecutive pair of stops.
    pub paths: FeatureCollection,
    /// `None` when there are no stops.
    pub bounds: Option<Bounds>,
}

/// Stops in sequence order. Ids without a stop record are skipped.
fn ordered_stops<'a>(
    sequence: &'a [String],
    destinations: &'a BTreeMap<String, Destination>,
) -> Vec<&'a Destination> {
    sequence
        .iter()
        .filter_map(|id| {
            let stop = destinations.get(id);
            if stop.is_none() {
                warn!("Sequence refers to unknown stop {}.", id);
            }
            stop
        })
        .collect()
}

pub fn project_route(
    sequence: &[String],
    destinations: &BTreeMap<String, Destination>,
) -> RouteProjection {
    let stops = ordered_stops(sequence, destinations);

    let points = stops
        .iter()
        .map(|stop| {
            let mut properties = Map::new();
            properties.insert("title".into(), stop.title.clone().into());
            properties.insert("id".into(), stop.id.clone().into());
            Feature::point(stop.lng_lat(), properties)
        })
        .collect();

    let coordinates: Vec<LngLat> = stops.iter().map(|stop| stop.lng_lat()).collect();
    let arcs = coordinates
        .windows(2)
        .map(|pair| Feature::line_string(great_circle(pair[0], pair[1], ARC_POINTS)))
        .collect();

    RouteProjection {
        stops: FeatureCollection::new(points),
        paths: FeatureCollection::new(arcs),
        bounds: Bounds::enclosing(coordinates),
    }
}

/// Memoized [`project_route`] keyed on the sequence and stop map.
#[derive(Debug, Default)]
pub struct RouteSelector {
    cache: Option<(Sequence, DestinationMap, Arc<RouteProjection>)>,
}

impl RouteSelector {
    pub fn new() -> Self {
        RouteSelector::default()
    }

    pub fn select(&mut self, state: &AuthorState) -> Arc<RouteProjection> {
        if let Some((sequence, destinations, projection)) = &self.cache {
            if Arc::ptr_eq(sequence, &state.sequence)
                && Arc::ptr_eq(destinations, &state.destinations)
            {
                return Arc::clone(projection);
            }
        }
        trace!("Recomputing route projection for {} stops.", state.sequence.len());
        let projection = Arc::new(project_route(&state.sequence, &state.destinations));
        self.cache = Some((
            Arc::clone(&state.sequence),
            Arc::clone(&state.destinations),
            Arc::clone(&projection),
        ));
        projection
    }
}

/// Location of the focused stop, or `None` when nothing (or a removed stop) is focused.
pub fn focused_destination_location(state: &AuthorState) -> Option<LngLat> {
    let id = state.focused_destination_id.as_ref()?;
    state.destinations.get(id).map(Destination::lng_lat)
}

pub fn destination_with_properties(
    state: &AuthorState,
    id: &str,
) -> Option<DestinationWithProperties> {
    let destination = state.destinations.get(id)?.clone();
    let properties = state.properties.get(id).cloned().unwrap_or_default();
    Some(DestinationWithProperties {
        destination,
        properties,
    })
}

/// POIs attached to a stop; empty for an unknown id.
pub fn destination_pois<'a>(state: &'a AuthorState, id: &str) -> &'a [Poi] {
    state
        .properties
        .get(id)
        .map(|properties| properties.pois.as_slice())
        .unwrap_or_default()
}

fn properties_as_map(properties: &DestinationProperties) -> Map<String, Value> {
    match serde_json::to_value(properties) {
        Ok(Value::Object(map)) => map,
        _ => Map::new(),
    }
}

/// Builds the self-contained document for the viewer.
///
/// Stop metadata is merged both into `stops` and into each point feature.
/// A stop without a properties record is published with default properties.
pub fn generate_output_itinerary(
    state: &AuthorState,
    route: &RouteProjection,
) -> PublishedItinerary {
    let properties_for = |id: &str| match state.properties.get(id) {
        Some(properties) => properties.clone(),
        None => {
            warn!("Publishing stop {} without properties, using defaults.", id);
            DestinationProperties::default()
        }
    };

    let stops: BTreeMap<String, DestinationWithProperties> =
        ordered_stops(&state.sequence, &state.destinations)
            .into_iter()
            .map(|destination| {
                let merged = DestinationWithProperties {
                    destination: destination.clone(),
                    properties: properties_for(&destination.id),
                };
                (destination.id.clone(), merged)
            })
            .collect();

    let mut points = route.stops.clone();
    for feature in &mut points.features {
        let Some(id) = feature
            .properties
            .get("id")
            .and_then(Value::as_str)
            .map(str::to_owned)
        else {
            continue;
        };
        let enrichment = stops
            .get(&id)
            .map(|stop| properties_as_map(&stop.properties))
            .unwrap_or_else(|| properties_as_map(&DestinationProperties::default()));
        feature.properties.extend(enrichment);
    }

    PublishedItinerary {
        id: None,
        title: state.title.clone(),
        description: state.description.clone(),
        stops,
        sequence: state.sequence.to_vec(),
        points,
        paths: route.paths.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{Command, Store};

    fn loaded() -> Store {
        let mut store = Store::new();
        store.dispatch(Command::AddBaseItinerary(vec![
            Destination::new("1a", "1", 0.0, 0.0),
            Destination::new("2b", "2", 0.0, 0.0),
            Destination::new("3c", "3", 0.0, 0.0),
        ]));
        store
    }

    #[test]
    fn route_has_a_point_per_stop_and_an_arc_per_leg() {
        let store = loaded();
        let route = RouteSelector::new().select(store.state());
        assert_eq!(route.stops.features.len(), 3);
        assert_eq!(route.paths.features.len(), 2);
        assert_eq!(route.stops.features[1].properties["id"], "2b");
        assert_eq!(route.stops.features[1].properties["title"], "2");
    }

    #[test]
    fn single_stop_has_no_arcs() {
        let mut store = Store::new();
        store.dispatch(Command::AddBaseItinerary(vec![Destination::new("x", "x", 1.0, 2.0)]));
        let route = project_route(&store.state().sequence, &store.state().destinations);
        assert!(route.paths.features.is_empty());
        assert_eq!(route.bounds, Some(Bounds::at([2.0, 1.0])));
    }

    #[test]
    fn empty_itinerary_has_no_bounds() {
        let route = RouteSelector::new().select(Store::new().state());
        assert!(route.stops.features.is_empty());
        assert!(route.bounds.is_none());
    }

    #[test]
    fn bounds_cover_every_stop() {
        let mut store = Store::new();
        store.dispatch(Command::AddBaseItinerary(vec![
            Destination::new("a", "a", 10.0, -20.0),
            Destination::new("b", "b", -5.0, 30.0),
        ]));
        let route = project_route(&store.state().sequence, &store.state().destinations);
        assert_eq!(
            route.bounds,
            Some(Bounds {
                west: -20.0,
                south: -5.0,
                east: 30.0,
                north: 10.0
            })
        );
    }

    #[test]
    fn selector_reuses_result_for_unchanged_inputs() {
        let mut store = loaded();
        let mut selector = RouteSelector::new();
        let first = selector.select(store.state());
        store.dispatch(Command::SetItineraryTitle("renamed".into()));
        let second = selector.select(store.state());
        assert!(Arc::ptr_eq(&first, &second));

        store.dispatch(Command::RemoveDestination { id: "2b".into() });
        let third = selector.select(store.state());
        assert!(!Arc::ptr_eq(&first, &third));
        assert_eq!(third.paths.features.len(), 1);
    }

    #[test]
    fn projection_is_deterministic() {
        let store = loaded();
        let state = store.state();
        let a = project_route(&state.sequence, &state.destinations);
        let b = project_route(&state.sequence, &state.destinations);
        assert_eq!(a, b);
    }

    #[test]
    fn focus_follows_the_focused_stop() {
        let mut store = Store::new();
        store.dispatch(Command::AddBaseItinerary(vec![Destination::new("a", "a", 48.85, 2.35)]));
        assert_eq!(focused_destination_location(store.state()), None);
        store.dispatch(Command::SetFocusedDestination {
            id: "a".into(),
            focused: true,
        });
        assert_eq!(focused_destination_location(store.state()), Some([2.35, 48.85]));
    }

    #[test]
    fn stale_focus_yields_nothing() {
        let mut store = loaded();
        store.dispatch(Command::SetFocusedDestination {
            id: "ghost".into(),
            focused: true,
        });
        assert_eq!(focused_destination_location(store.state()), None);
    }

    #[test]
    fn output_merges_stops_with_properties() {
        let mut store = loaded();
        store.dispatch(Command::SetItineraryTitle("Trip".into()));
        store.dispatch(Command::AssignDestinationImage {
            id: "1a".into(),
            url: "a.jpg".into(),
        });
        let route = RouteSelector::new().select(store.state());
        let output = generate_output_itinerary(store.state(), &route);

        assert_eq!(output.title, "Trip");
        assert_eq!(output.description, "");
        assert_eq!(output.sequence, vec!["1a", "2b", "3c"]);
        assert_eq!(output.stops.len(), 3);
        let first = &output.stops["1a"];
        assert_eq!(first.destination, Destination::new("1a", "1", 0.0, 0.0));
        assert_eq!(first.properties.image_url.as_deref(), Some("a.jpg"));
        assert_eq!(output.paths.features.len(), 2);
        assert_eq!(output.points.features.len(), 3);
        assert_eq!(output.points.features[0].properties["imageURL"], "a.jpg");
        assert_eq!(output.points.features[2].properties["lengthOfStay"], 1.0);
    }

    #[test]
    fn output_tolerates_missing_properties() {
        let mut state = loaded().state().clone();
        let mut properties = (*state.properties).clone();
        properties.remove("2b");
        state.properties = Arc::new(properties);

        let route = project_route(&state.sequence, &state.destinations);
        let output = generate_output_itinerary(&state, &route);
        assert_eq!(output.stops["2b"].properties, DestinationProperties::default());
        assert_eq!(output.points.features[1].properties["lengthOfStay"], 1.0);
    }

    #[test]
    fn lookups_handle_unknown_ids() {
        let store = loaded();
        assert!(destination_pois(store.state(), "nope").is_empty());
        assert!(destination_with_properties(store.state(), "nope").is_none());
        let merged = destination_with_properties(store.state(), "1a").unwrap();
        assert_eq!(merged.properties.length_of_stay, 1.0);
    }
}
