use crate::data::{Destination, Poi, PropertyValue, PublishedItinerary};
use crate::geo::FeatureCollection;

/// Everything the authoring store can be asked to do.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Full replace of the stop list, stop records and properties.
    AddBaseItinerary(Vec<Destination>),
    /// `position` is clamped to the current sequence length.
    InsertDestination {
        destination: Destination,
        position: usize,
    },
    RemoveDestination {
        id: String,
    },
    AddDestinationProperty {
        id: String,
        key: String,
        value: PropertyValue,
    },
    AddDestinationPoi {
        id: String,
        poi: Poi,
    },
    RemoveDestinationPoi {
        id: String,
        poi_id: String,
    },
    AssignDestinationImage {
        id: String,
        url: String,
    },
    SetItineraryTitle(String),
    SetItineraryDescription(String),
    SetFocusedDestination {
        id: String,
        focused: bool,
    },
    ShowNearbyPois(bool),
    SetNearbyPois(FeatureCollection),
    AddError(String),
    ClearErrors,
    AddImageSources(Vec<String>),
    SaveOutputItinerary(PublishedItinerary),
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::AddBaseItinerary(_) => "ADD_BASE_ITINERARY",
            Command::InsertDestination { .. } => "INSERT_DESTINATION",
            Command::RemoveDestination { .. } => "REMOVE_DESTINATION",
            Command::AddDestinationProperty { .. } => "ADD_DESTINATION_PROPERTY",
            Command::AddDestinationPoi { .. } => "ADD_DESTINATION_POI",
            Command::RemoveDestinationPoi { .. } => "REMOVE_DESTINATION_POI",
            Command::AssignDestinationImage { .. } => "ASSIGN_DESTINATION_IMAGE",
            Command::SetItineraryTitle(_) => "SET_ITINERARY_TITLE",
            Command::SetItineraryDescription(_) => "SET_ITINERARY_DESCRIPTION",
            Command::SetFocusedDestination { .. } => "SET_FOCUSED_DESTINATION",
            Command::ShowNearbyPois(_) => "SHOW_NEARBY_POIS",
            Command::SetNearbyPois(_) => "SET_NEARBY_POIS",
            Command::AddError(_) => "ADD_ERROR",
            Command::ClearErrors => "CLEAR_ERRORS",
            Command::AddImageSources(_) => "ADD_IMAGE_SOURCES",
            Command::SaveOutputItinerary(_) => "SAVE_OUTPUT_ITINERARY",
        }
    }
}
