use std::fmt;

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

/// Network location of an inverter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InverterEndpoint {
    pub host: String,
    pub port: u16,
}

macro_rules! unit {
    ($(#[$meta:meta])* $name:ident, $divisor:expr, $precision:expr, $suffix:expr) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, Default, PartialEq, PartialOrd, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(f64);

        impl $name {
            pub fn from_raw(raw: impl Into<f64>) -> Self {
                Self(raw.into() / $divisor)
            }

            pub fn value(self) -> f64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{:.*}{}", $precision, self.0, $suffix)
            }
        }
    };
}

unit!(
    /// Watts, reported unscaled.
    Power, 1.0, 0, "W"
);
unit!(
    /// Volts, reported in tenths.
    Voltage, 10.0, 1, "V"
);
unit!(
    /// Amperes, reported in tenths.
    Current, 10.0, 1, "A"
);
unit!(
    /// Hertz, reported in hundredths.
    Frequency, 100.0, 2, "Hz"
);
unit!(
    /// Degrees Celsius, reported in tenths.
    Temperature, 10.0, 1, "°C"
);

/// Kilowatt hours, reported in tenths.
///
/// The device reports `-1` for counters it does not track; those decode to zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Energy(f64);

impl Energy {
    pub fn from_raw(raw: impl Into<f64>) -> Self {
        let raw = raw.into();
        if raw == -1.0 {
            return Self(0.0);
        }
        Self(raw / 10.0)
    }

    pub fn value(self) -> f64 {
        self.0
    }
}

impl fmt::Display for Energy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.1}kWh", self.0)
    }
}

/// Static identity of an inverter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceInfo {
    pub modbus_version: u16,
    pub rated_power: u16,
    pub ac_output_type: u16,
    /// Fixed-width field, kept with its padding.
    pub serial_number: String,
    pub model_name: String,
    pub dsp1_sw_version: u16,
    pub dsp2_sw_version: u16,
    pub dsp_svn_version: u16,
    pub arm_sw_version: u16,
    pub arm_svn_version: u16,
    pub software_version: String,
    pub arm_version: String,
    /// Derived from the serial number, never transmitted.
    pub single_phase: bool,
}

/// One runtime telemetry sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuntimeData {
    pub timestamp: DateTime<FixedOffset>,

    pub pv1_voltage: Voltage,
    pub pv1_current: Current,
    pub pv1_power: Power,
    pub pv2_voltage: Voltage,
    pub pv2_current: Current,
    pub pv2_power: Power,
    pub pv_power: Power,
    pub pv2_mode: u8,
    pub pv1_mode: u8,

    pub on_grid_l1_voltage: Voltage,
    pub on_grid_l1_current: Current,
    pub on_grid_l1_frequency: Frequency,
    pub on_grid_l1_power: Power,
    pub on_grid_l2_voltage: Voltage,
    pub on_grid_l2_current: Current,
    pub on_grid_l2_frequency: Frequency,
    pub on_grid_l2_power: Power,
    pub on_grid_l3_voltage: Voltage,
    pub on_grid_l3_current: Current,
    pub on_grid_l3_frequency: Frequency,
    pub on_grid_l3_power: Power,
    pub grid_mode: i16,
    pub total_inverter_power: Power,
    pub active_power: Power,
    pub reactive_power: i32,
    pub apparent_power: i32,

    pub backup_l1_voltage: Voltage,
    pub backup_l1_current: Current,
    pub backup_l1_frequency: Frequency,
    pub load_mode_l1: i16,
    pub backup_l1_power: Power,
    pub backup_l2_voltage: Voltage,
    pub backup_l2_current: Current,
    pub backup_l2_frequency: Frequency,
    pub load_mode_l2: i16,
    pub backup_l2_power: Power,
    pub backup_l3_voltage: Voltage,
    pub backup_l3_current: Current,
    pub backup_l3_frequency: Frequency,
    pub load_mode_l3: i16,
    pub backup_l3_power: Power,

    pub load_l1: Power,
    pub load_l2: Power,
    pub load_l3: Power,
    pub backup_load: Power,
    pub load: Power,
    pub ups_load: i16,

    pub temperature_air: Temperature,
    pub temperature_module: Temperature,
    pub temperature: Temperature,
    #[serde(skip_serializing, default)]
    pub function_bit: i16,
    pub bus_voltage: Voltage,
    pub nbus_voltage: Voltage,

    pub battery_voltage: Voltage,
    pub battery_current: Current,
    pub battery_mode: i32,
    pub warning_code: i16,
    pub safety_country_code: i16,
    pub work_mode: i32,
    pub operation_code: i16,
    #[serde(skip_serializing, default)]
    pub error_codes: i16,

    #[serde(rename = "pv_generation_total")]
    pub energy_generation_total: Energy,
    #[serde(rename = "pv_generation_today")]
    pub energy_generation_today: Energy,
    pub energy_export_total: Energy,
    pub energy_export_total_hours: i32,
    pub energy_export_today: Energy,
    pub energy_import_total: Energy,
    pub energy_import_today: Energy,
    pub energy_load_total: Energy,
    pub energy_load_day: Energy,
    pub battery_charge_total: i32,
    pub battery_charge_today: i16,
    pub battery_discharge_total: i32,
    pub battery_discharge_today: i16,
    #[serde(skip_serializing, default)]
    pub diag_status_code: i32,

    pub house_consumption: Power,
}
