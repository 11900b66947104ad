use crate::services::{profiles::ProfileService, rides::RideRequestService};

#[derive(Clone)]
pub struct AppState {
    pub rides: RideRequestService,
    pub profiles: ProfileService,
}

impl AppState {
    pub fn new(rides: RideRequestService, profiles: ProfileService) -> Self {
        Self { rides, profiles }
    }
}
