//! The zone/beacon selection protocol.
//!
//! At most one session exists farm-wide. A session belongs to one
//! warehouse and collects beacons in order; each beacon covers a square of
//! the size selected when it was placed. Every rejected command leaves the
//! session untouched.

use dronehouse_types::{MessageKey, Tile, TileRect, WarehouseId};

use crate::command::CommandOutcome;
use crate::config::FarmerConfig;
use crate::zone::{Beacon, zone_tile_count};

/// A live selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionSession {
    warehouse: WarehouseId,
    beacons: Vec<Beacon>,
    size: u32,
}

impl SelectionSession {
    /// The warehouse the zone will be queued on.
    pub const fn warehouse(&self) -> WarehouseId {
        self.warehouse
    }

    /// Beacons in placement order.
    pub fn beacons(&self) -> &[Beacon] {
        &self.beacons
    }

    /// Square size for the next beacon.
    pub const fn size(&self) -> u32 {
        self.size
    }

    /// Distinct tiles covered so far.
    pub fn zone_tile_count(&self) -> usize {
        zone_tile_count(&self.beacons)
    }
}

/// Owner of the farm-wide selection session.
#[derive(Debug, Clone, Default)]
pub struct Selector {
    session: Option<SelectionSession>,
    last_size: Option<u32>,
}

impl Selector {
    /// No session, no remembered size.
    pub const fn new() -> Self {
        Self {
            session: None,
            last_size: None,
        }
    }

    /// The live session, if any.
    pub const fn session(&self) -> Option<&SelectionSession> {
        self.session.as_ref()
    }

    /// Whether a session is live.
    pub const fn is_active(&self) -> bool {
        self.session.is_some()
    }

    /// The warehouse owning the live session.
    pub fn owner(&self) -> Option<WarehouseId> {
        self.session.as_ref().map(|s| s.warehouse)
    }

    /// Size the last session ended with, if any.
    pub const fn last_size(&self) -> Option<u32> {
        self.last_size
    }

    /// Start a session on `warehouse`.
    ///
    /// Ignored while another session is live. Rejected when the warehouse
    /// has no farmers. A size outside the configured set falls back to the
    /// configured start size.
    pub fn begin(
        &mut self,
        warehouse: WarehouseId,
        farmer_count: u32,
        size: u32,
        config: &FarmerConfig,
    ) -> CommandOutcome {
        if self.session.is_some() {
            return CommandOutcome::ignored();
        }
        if farmer_count == 0 {
            return CommandOutcome::rejected(MessageKey::NoFarmer);
        }
        let size = if config.zone_sizes.contains(&size) {
            size
        } else {
            config.start_size
        };
        self.session = Some(SelectionSession {
            warehouse,
            beacons: Vec::new(),
            size,
        });
        CommandOutcome::applied(Some(MessageKey::SelectionStarted))
    }

    /// Append a beacon at `tile` with the current size.
    ///
    /// `home` is the warehouse's centre tile, used for the radius check.
    pub fn add_beacon(&mut self, tile: Tile, home: Tile, config: &FarmerConfig) -> CommandOutcome {
        let Some(session) = self.session.as_mut() else {
            return CommandOutcome::ignored();
        };
        if tile.chebyshev(home) > config.max_beacon_radius {
            return CommandOutcome::rejected(MessageKey::BeaconTooFar);
        }
        if session.beacons.len() >= usize::try_from(config.max_beacons).unwrap_or(usize::MAX) {
            return CommandOutcome::rejected(MessageKey::TooManyBeacons);
        }
        let beacon = Beacon::new(tile, session.size);
        let mut projected = session.beacons.clone();
        projected.push(beacon);
        if zone_tile_count(&projected) > usize::try_from(config.max_zone_tiles).unwrap_or(usize::MAX)
        {
            return CommandOutcome::rejected(MessageKey::ZoneTooLarge);
        }
        session.beacons = projected;
        CommandOutcome::applied(None)
    }

    /// Pop the most recent beacon.
    pub fn remove_last(&mut self) -> CommandOutcome {
        match self.session.as_mut().and_then(|s| s.beacons.pop()) {
            Some(_) => CommandOutcome::applied(None),
            None => CommandOutcome::ignored(),
        }
    }

    /// Advance to the next configured size, wrapping.
    pub fn cycle_size(&mut self, config: &FarmerConfig) -> CommandOutcome {
        let Some(session) = self.session.as_mut() else {
            return CommandOutcome::ignored();
        };
        let sizes = &config.zone_sizes;
        let next = sizes
            .iter()
            .position(|s| *s == session.size)
            .and_then(|i| sizes.get(i.saturating_add(1)))
            .or_else(|| sizes.first())
            .copied()
            .unwrap_or(session.size);
        session.size = next;
        self.last_size = Some(next);
        CommandOutcome::applied(None)
    }

    /// Discard the session.
    pub fn cancel(&mut self) -> CommandOutcome {
        match self.session.take() {
            Some(session) => {
                self.last_size = Some(session.size);
                CommandOutcome::applied(Some(MessageKey::SelectionCancelled))
            }
            None => CommandOutcome::ignored(),
        }
    }

    /// Discard the session if `warehouse` owns it. Returns whether it did.
    pub fn cancel_if_owned_by(&mut self, warehouse: WarehouseId) -> bool {
        if self.owner() == Some(warehouse) {
            self.session = None;
            return true;
        }
        false
    }

    /// End the session for a successful commit.
    pub fn finish(&mut self) -> Option<SelectionSession> {
        let session = self.session.take()?;
        self.last_size = Some(session.size);
        Some(session)
    }

    /// The square the next beacon at `tile` would cover.
    pub fn hover_preview(&self, tile: Tile) -> Option<TileRect> {
        self.session
            .as_ref()
            .map(|s| TileRect::square_around(tile, s.size))
    }

    /// Squares of every placed beacon.
    pub fn preview_squares(&self) -> Vec<TileRect> {
        self.session
            .as_ref()
            .map(|s| s.beacons.iter().map(Beacon::square).collect())
            .unwrap_or_default()
    }

    /// Current size as `"NxN"`.
    pub fn size_text(&self) -> Option<String> {
        self.session
            .as_ref()
            .map(|s| format!("{0}x{0}", s.size))
    }
}
