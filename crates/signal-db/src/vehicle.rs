//! Built-in Vehicle Catalog
//!
//! Engine, ABS, airbag and body status messages broadcast by the simulated
//! ECU network.

use crate::database::SignalDatabase;
use crate::error::CatalogError;
use crate::message::MessageDef;
use crate::signal::SignalDef;

const OFF_ON: &[(u64, &str)] = &[(0, "OFF"), (1, "ON")];
const CLOSED_OPEN: &[(u64, &str)] = &[(0, "CLOSED"), (1, "OPEN")];

fn engine_status() -> MessageDef {
    MessageDef::new("ENGINE_STATUS", 0x100, 8)
        .with_signal(
            SignalDef::new("ENGINE_SPEED", 0, 16)
                .scaled(0.25, 0.0)
                .range(0.0, 8000.0)
                .unit("rpm"),
        )
        .with_signal(
            SignalDef::new("ENGINE_TEMP", 16, 8)
                .scaled(1.0, -40.0)
                .range(-40.0, 215.0)
                .unit("degC"),
        )
        .with_signal(
            SignalDef::new("THROTTLE_POSITION", 24, 8)
                .scaled(0.4, 0.0)
                .range(0.0, 100.0)
                .unit("%"),
        )
        .with_signal(
            SignalDef::new("ENGINE_LOAD", 32, 8)
                .scaled(0.5, 0.0)
                .range(0.0, 100.0)
                .unit("%"),
        )
        .with_signal(
            SignalDef::new("FUEL_LEVEL", 40, 8)
                .scaled(0.5, 0.0)
                .range(0.0, 100.0)
                .unit("%"),
        )
}

fn abs_status() -> MessageDef {
    let wheel = |name: &str, start_bit: u8| {
        SignalDef::new(name, start_bit, 12)
            .scaled(0.1, 0.0)
            .range(0.0, 300.0)
            .unit("km/h")
    };

    MessageDef::new("ABS_STATUS", 0x200, 8)
        .with_signal(wheel("WHEEL_SPEED_FL", 0))
        .with_signal(wheel("WHEEL_SPEED_FR", 12))
        .with_signal(wheel("WHEEL_SPEED_RL", 24))
        .with_signal(wheel("WHEEL_SPEED_RR", 36))
        .with_signal(SignalDef::new("ABS_ACTIVE", 48, 1).choices(&[(0, "INACTIVE"), (1, "ACTIVE")]))
        .with_signal(SignalDef::new("ABS_FAULT", 49, 1).choices(&[(0, "OK"), (1, "FAULT")]))
        .with_signal(
            SignalDef::new("LATERAL_ACCEL", 56, 8)
                .signed()
                .scaled(0.1, 0.0)
                .range(-12.8, 12.7)
                .unit("m/s2"),
        )
}

fn airbag_status() -> MessageDef {
    let belt: &[(u64, &str)] = &[(0, "UNBUCKLED"), (1, "BUCKLED")];

    MessageDef::new("AIRBAG_STATUS", 0x300, 8)
        .with_signal(SignalDef::new("AIRBAG_DEPLOYED", 0, 1).choices(&[(0, "NO"), (1, "YES")]))
        .with_signal(SignalDef::new("CRASH_DETECTED", 1, 1).choices(&[(0, "NO"), (1, "YES")]))
        .with_signal(SignalDef::new("SEATBELT_DRIVER", 2, 1).choices(belt))
        .with_signal(SignalDef::new("SEATBELT_PASSENGER", 3, 1).choices(belt))
        .with_signal(
            SignalDef::new("OCCUPANCY_PASSENGER", 4, 2)
                .choices(&[(0, "EMPTY"), (1, "CHILD"), (2, "ADULT")]),
        )
        .with_signal(SignalDef::new("AIRBAG_WARNING_LAMP", 8, 1).choices(OFF_ON))
}

fn body_status() -> MessageDef {
    MessageDef::new("BODY_STATUS", 0x400, 8)
        .with_signal(SignalDef::new("DOOR_FL", 0, 1).choices(CLOSED_OPEN))
        .with_signal(SignalDef::new("DOOR_FR", 1, 1).choices(CLOSED_OPEN))
        .with_signal(SignalDef::new("DOOR_RL", 2, 1).choices(CLOSED_OPEN))
        .with_signal(SignalDef::new("DOOR_RR", 3, 1).choices(CLOSED_OPEN))
        .with_signal(
            SignalDef::new("HEADLIGHTS", 4, 2).choices(&[(0, "OFF"), (1, "LOW"), (2, "HIGH")]),
        )
        .with_signal(
            SignalDef::new("TURN_SIGNAL", 6, 2)
                .choices(&[(0, "OFF"), (1, "LEFT"), (2, "RIGHT"), (3, "HAZARD")]),
        )
        .with_signal(
            SignalDef::new("AMBIENT_TEMP", 8, 8)
                .scaled(0.5, -40.0)
                .range(-40.0, 87.5)
                .unit("degC"),
        )
        .with_signal(
            SignalDef::new("BATTERY_VOLTAGE", 16, 16)
                .scaled(0.01, 0.0)
                .range(0.0, 20.0)
                .unit("V"),
        )
        .with_signal(
            SignalDef::new("CABIN_TEMP", 32, 32)
                .float()
                .range(-40.0, 85.0)
                .unit("degC"),
        )
}

impl SignalDatabase {
    /// The built-in vehicle catalog
    pub fn vehicle() -> Result<Self, CatalogError> {
        Self::new(vec![
            engine_status(),
            abs_status(),
            airbag_status(),
            body_status(),
        ])
    }
}
