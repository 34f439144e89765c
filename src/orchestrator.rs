//! Runs the asynchronous work behind user triggers and commits the results to
//! the store.
//!
//! Each trigger kind has its own generation counter. A trigger takes a ticket
//! when it starts and may only commit while that ticket is still the newest of
//! its kind, so a slow geocoding batch can never overwrite a newer one.
//! Different kinds never supersede each other.

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use derive_more::Display;
use log::*;
use tokio::sync::Mutex;

use crate::data::Destination;
use crate::error::{AssociationWarning, IngestError};
use crate::geo::LngLat;
use crate::ingest;
use crate::selectors::{generate_output_itinerary, RouteProjection, RouteSelector};
use crate::services::geocoding::AddressResolver;
use crate::services::nearby::NearbyPoiService;
use crate::store::{AuthorState, Command, Store};

#[derive(Debug, Display, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    Ingest,
    NearbySearch,
    Publish,
}

/// What became of a trigger's result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Committed,
    /// A newer trigger of the same kind started first; nothing was dispatched.
    Superseded,
}

#[derive(Debug, Clone, Copy)]
struct Ticket {
    trigger: Trigger,
    generation: u64,
}

#[derive(Debug, Default)]
struct Generations {
    ingest: AtomicU64,
    nearby_search: AtomicU64,
    publish: AtomicU64,
}

impl Generations {
    fn counter(&self, trigger: Trigger) -> &AtomicU64 {
        match trigger {
            Trigger::Ingest => &self.ingest,
            Trigger::NearbySearch => &self.nearby_search,
            Trigger::Publish => &self.publish,
        }
    }

    fn begin(&self, trigger: Trigger) -> Ticket {
        let generation = self.counter(trigger).fetch_add(1, Ordering::SeqCst) + 1;
        Ticket { trigger, generation }
    }

    fn is_current(&self, ticket: Ticket) -> bool {
        self.counter(ticket.trigger).load(Ordering::SeqCst) == ticket.generation
    }
}

#[derive(Debug, Default)]
struct Shared {
    store: Store,
    routes: RouteSelector,
}

/// Handle to the authoring session. Clones share the same store.
#[derive(Clone)]
pub struct Orchestrator {
    shared: Arc<Mutex<Shared>>,
    generations: Arc<Generations>,
    geocoder: Arc<dyn AddressResolver>,
    nearby: Arc<dyn NearbyPoiService>,
}

impl Orchestrator {
    pub fn new(geocoder: Arc<dyn AddressResolver>, nearby: Arc<dyn NearbyPoiService>) -> Self {
        Orchestrator {
            shared: Arc::new(Mutex::new(Shared::default())),
            generations: Arc::new(Generations::default()),
            geocoder,
            nearby,
        }
    }

    /// Applies a command that needs no asynchronous work.
    pub async fn dispatch(&self, command: Command) -> Vec<AssociationWarning> {
        self.shared.lock().await.store.dispatch(command)
    }

    pub async fn snapshot(&self) -> AuthorState {
        self.shared.lock().await.store.state().clone()
    }

    /// Current route geometry, memoized across calls.
    pub async fn routes(&self) -> Arc<RouteProjection> {
        let mut shared = self.shared.lock().await;
        let Shared { store, routes } = &mut *shared;
        routes.select(store.state())
    }

    async fn commit(&self, ticket: Ticket, command: Command) -> Outcome {
        let mut shared = self.shared.lock().await;
        if !self.generations.is_current(ticket) {
            debug!(
                "Discarding {} from stale {} trigger #{}.",
                command.name(),
                ticket.trigger,
                ticket.generation
            );
            return Outcome::Superseded;
        }
        shared.store.dispatch(command);
        Outcome::Committed
    }

    async fn commit_ingestion(
        &self,
        ticket: Ticket,
        result: Result<Vec<Destination>, IngestError>,
    ) -> Outcome {
        let command = match result {
            Ok(places) => {
                info!("Loaded {} stops.", places.len());
                Command::AddBaseItinerary(places)
            }
            Err(why) => {
                warn!("Ingestion failed: {}", why);
                Command::AddError(format!("Failed to read itinerary file {}", why))
            }
        };
        self.commit(ticket, command).await
    }

    /// Reads an itinerary file and replaces the stop list with its contents.
    pub async fn load_from_file(&self, path: impl AsRef<Path>) -> Outcome {
        let ticket = self.generations.begin(Trigger::Ingest);
        let result = ingest::load_file(path.as_ref(), &*self.geocoder).await;
        self.commit_ingestion(ticket, result).await
    }

    /// As [`Orchestrator::load_from_file`], for contents already in memory.
    pub async fn load_from_text(&self, contents: &str) -> Outcome {
        let ticket = self.generations.begin(Trigger::Ingest);
        let result = ingest::resolve(contents, &*self.geocoder).await;
        self.commit_ingestion(ticket, result).await
    }

    pub async fn find_nearby(&self, tileset: &str, lng_lat: LngLat) -> Outcome {
        let ticket = self.generations.begin(Trigger::NearbySearch);
        let command = match self.nearby.find_nearby(tileset, lng_lat).await {
            Ok(pois) => Command::SetNearbyPois(pois),
            Err(why) => {
                warn!("Nearby search failed: {}", why);
                Command::AddError(format!("Failed to search for nearby places {}", why))
            }
        };
        self.commit(ticket, command).await
    }

    /// Generates the published itinerary from the current state and saves it.
    pub async fn publish(&self) -> Outcome {
        let ticket = self.generations.begin(Trigger::Publish);
        let mut shared = self.shared.lock().await;
        if !self.generations.is_current(ticket) {
            debug!("Discarding stale publish trigger #{}.", ticket.generation);
            return Outcome::Superseded;
        }
        let Shared { store, routes } = &mut *shared;
        let route = routes.select(store.state());
        let itinerary = generate_output_itinerary(store.state(), &route);
        info!(
            "Published itinerary {:?} with {} stops.",
            itinerary.title,
            itinerary.sequence.len()
        );
        store.dispatch(Command::SaveOutputItinerary(itinerary));
        Outcome::Committed
    }
}
