//! Decodes the ET-series device-info and runtime-data register blocks into
//! typed records.

mod layout;

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveDateTime, TimeZone};
use chrono_tz::Tz;
use thiserror::Error;
use tracing::{debug, warn};
use types::{Current, DeviceInfo, Energy, Frequency, Power, RuntimeData, Temperature, Voltage};

pub use layout::device_info::LEN as DEVICE_INFO_LEN;
pub use layout::runtime_data::LEN as RUNTIME_DATA_LEN;

/// Zone the inverter clock is assumed to run in.
pub const DEFAULT_TIMEZONE: &str = "Europe/Madrid";

const SINGLE_PHASE_MARKER: &str = "EHU";

#[derive(Debug, Error)]
pub enum ParserError {
    #[error("buffer truncated: need {expected} bytes, got {actual}")]
    TruncatedBuffer { expected: usize, actual: usize },
    #[error("unknown timezone `{0}`")]
    UnknownTimezone(String),
}

pub fn resolve_timezone(name: &str) -> Result<Tz, ParserError> {
    name.parse::<Tz>()
        .map_err(|_| ParserError::UnknownTimezone(name.to_string()))
}

/// Single-phase models carry `EHU` in their serial number.
pub fn is_single_phase(serial_number: &str) -> bool {
    serial_number.contains(SINGLE_PHASE_MARKER)
}

pub fn decode_device_info(p: &[u8]) -> Result<DeviceInfo, ParserError> {
    use layout::device_info::*;

    ensure_len(p, LEN)?;

    let serial_number = text(p, SERIAL_NUMBER, SERIAL_NUMBER_LEN);
    let model_name = text(p, MODEL_NAME, MODEL_NAME_LEN)
        .trim_matches(|c: char| c.is_whitespace() || c == '\0')
        .to_string();
    let single_phase = is_single_phase(&serial_number);
    debug!(model = %model_name, single_phase, "decoded device info");

    Ok(DeviceInfo {
        modbus_version: be_u16(p, MODBUS_VERSION),
        rated_power: be_u16(p, RATED_POWER),
        ac_output_type: be_u16(p, AC_OUTPUT_TYPE),
        serial_number,
        model_name,
        dsp1_sw_version: be_u16(p, DSP1_SW_VERSION),
        dsp2_sw_version: be_u16(p, DSP2_SW_VERSION),
        dsp_svn_version: be_u16(p, DSP_SVN_VERSION),
        arm_sw_version: be_u16(p, ARM_SW_VERSION),
        arm_svn_version: be_u16(p, ARM_SVN_VERSION),
        software_version: text(p, SOFTWARE_VERSION, SOFTWARE_VERSION_LEN),
        arm_version: text(p, ARM_VERSION, ARM_VERSION_LEN),
        single_phase,
    })
}

/// Decodes one runtime sample. Phase 2/3 fields are zeroed when
/// `single_phase` is set, whatever the device reported for them.
pub fn decode_runtime_data(
    p: &[u8],
    single_phase: bool,
    timezone: &str,
) -> Result<RuntimeData, ParserError> {
    use layout::runtime_data::*;

    let tz = resolve_timezone(timezone)?;
    ensure_len(p, LEN)?;

    let timestamp = decode_timestamp(p, tz);
    let l23 = |value| mask_phase(value, single_phase);
    let l23_wide = |value| mask_phase(value, single_phase);

    let pv1_power = be_i32(p, PV1_POWER);
    let pv2_power = be_i32(p, PV2_POWER);
    let active_power = be_i32(p, ACTIVE_POWER);
    let battery_voltage = be_i16(p, BATTERY_VOLTAGE);
    let battery_current = be_i16(p, BATTERY_CURRENT);

    // Mixes raw register magnitudes: battery V*A is in tenths squared.
    let house_consumption = f64::from(pv1_power) + f64::from(pv2_power)
        + (f64::from(battery_voltage) * f64::from(battery_current)).round()
        - f64::from(active_power);

    Ok(RuntimeData {
        timestamp,

        pv1_voltage: Voltage::from_raw(be_i16(p, PV1_VOLTAGE)),
        pv1_current: Current::from_raw(be_i16(p, PV1_CURRENT)),
        pv1_power: Power::from_raw(pv1_power),
        pv2_voltage: Voltage::from_raw(be_i16(p, PV2_VOLTAGE)),
        pv2_current: Current::from_raw(be_i16(p, PV2_CURRENT)),
        pv2_power: Power::from_raw(pv2_power),
        pv_power: Power::from_raw(f64::from(pv1_power) + f64::from(pv2_power)),
        pv2_mode: p[PV2_MODE],
        pv1_mode: p[PV1_MODE],

        on_grid_l1_voltage: Voltage::from_raw(be_i16(p, ON_GRID_L1_VOLTAGE)),
        on_grid_l1_current: Current::from_raw(be_i16(p, ON_GRID_L1_CURRENT)),
        on_grid_l1_frequency: Frequency::from_raw(be_i16(p, ON_GRID_L1_FREQUENCY)),
        on_grid_l1_power: Power::from_raw(be_i32(p, ON_GRID_L1_POWER)),
        on_grid_l2_voltage: Voltage::from_raw(l23(be_i16(p, ON_GRID_L2_VOLTAGE))),
        on_grid_l2_current: Current::from_raw(l23(be_i16(p, ON_GRID_L2_CURRENT))),
        on_grid_l2_frequency: Frequency::from_raw(l23(be_i16(p, ON_GRID_L2_FREQUENCY))),
        on_grid_l2_power: Power::from_raw(l23_wide(be_i32(p, ON_GRID_L2_POWER))),
        on_grid_l3_voltage: Voltage::from_raw(l23(be_i16(p, ON_GRID_L3_VOLTAGE))),
        on_grid_l3_current: Current::from_raw(l23(be_i16(p, ON_GRID_L3_CURRENT))),
        on_grid_l3_frequency: Frequency::from_raw(l23(be_i16(p, ON_GRID_L3_FREQUENCY))),
        on_grid_l3_power: Power::from_raw(l23_wide(be_i32(p, ON_GRID_L3_POWER))),
        grid_mode: be_i16(p, GRID_MODE),
        total_inverter_power: Power::from_raw(be_i32(p, TOTAL_INVERTER_POWER)),
        active_power: Power::from_raw(active_power),
        reactive_power: be_i32(p, REACTIVE_POWER),
        apparent_power: be_i32(p, APPARENT_POWER),

        backup_l1_voltage: Voltage::from_raw(be_i16(p, BACKUP_L1_VOLTAGE)),
        backup_l1_current: Current::from_raw(be_i16(p, BACKUP_L1_CURRENT)),
        backup_l1_frequency: Frequency::from_raw(be_i16(p, BACKUP_L1_FREQUENCY)),
        load_mode_l1: be_i16(p, LOAD_MODE_L1),
        backup_l1_power: Power::from_raw(be_i32(p, BACKUP_L1_POWER)),
        backup_l2_voltage: Voltage::from_raw(l23(be_i16(p, BACKUP_L2_VOLTAGE))),
        backup_l2_current: Current::from_raw(l23(be_i16(p, BACKUP_L2_CURRENT))),
        backup_l2_frequency: Frequency::from_raw(l23(be_i16(p, BACKUP_L2_FREQUENCY))),
        load_mode_l2: l23(be_i16(p, LOAD_MODE_L2)),
        backup_l2_power: Power::from_raw(l23_wide(be_i32(p, BACKUP_L2_POWER))),
        backup_l3_voltage: Voltage::from_raw(l23(be_i16(p, BACKUP_L3_VOLTAGE))),
        backup_l3_current: Current::from_raw(l23(be_i16(p, BACKUP_L3_CURRENT))),
        backup_l3_frequency: Frequency::from_raw(l23(be_i16(p, BACKUP_L3_FREQUENCY))),
        load_mode_l3: l23(be_i16(p, LOAD_MODE_L3)),
        backup_l3_power: Power::from_raw(l23_wide(be_i32(p, BACKUP_L3_POWER))),

        load_l1: Power::from_raw(be_i32(p, LOAD_L1)),
        load_l2: Power::from_raw(l23_wide(be_i32(p, LOAD_L2))),
        load_l3: Power::from_raw(l23_wide(be_i32(p, LOAD_L3))),
        backup_load: Power::from_raw(be_i32(p, BACKUP_LOAD)),
        load: Power::from_raw(be_i32(p, LOAD)),
        ups_load: be_i16(p, UPS_LOAD),

        temperature_air: Temperature::from_raw(be_i16(p, TEMPERATURE_AIR)),
        temperature_module: Temperature::from_raw(be_i16(p, TEMPERATURE_MODULE)),
        temperature: Temperature::from_raw(be_i16(p, TEMPERATURE)),
        function_bit: be_i16(p, FUNCTION_BIT),
        bus_voltage: Voltage::from_raw(be_i16(p, BUS_VOLTAGE)),
        nbus_voltage: Voltage::from_raw(be_i16(p, NBUS_VOLTAGE)),

        battery_voltage: Voltage::from_raw(battery_voltage),
        battery_current: Current::from_raw(battery_current),
        battery_mode: be_i32(p, BATTERY_MODE),
        warning_code: be_i16(p, WARNING_CODE),
        safety_country_code: be_i16(p, SAFETY_COUNTRY_CODE),
        work_mode: be_i32(p, WORK_MODE),
        operation_code: be_i16(p, OPERATION_CODE),
        error_codes: be_i16(p, ERROR_CODES),

        energy_generation_total: Energy::from_raw(be_i32(p, ENERGY_GENERATION_TOTAL)),
        energy_generation_today: Energy::from_raw(be_i32(p, ENERGY_GENERATION_TODAY)),
        energy_export_total: Energy::from_raw(be_i32(p, ENERGY_EXPORT_TOTAL)),
        energy_export_total_hours: be_i32(p, ENERGY_EXPORT_TOTAL_HOURS),
        energy_export_today: Energy::from_raw(be_i16(p, ENERGY_EXPORT_TODAY)),
        energy_import_total: Energy::from_raw(be_i32(p, ENERGY_IMPORT_TOTAL)),
        energy_import_today: Energy::from_raw(be_i16(p, ENERGY_IMPORT_TODAY)),
        energy_load_total: Energy::from_raw(be_i32(p, ENERGY_LOAD_TOTAL)),
        energy_load_day: Energy::from_raw(be_i16(p, ENERGY_LOAD_DAY)),
        battery_charge_total: be_i32(p, BATTERY_CHARGE_TOTAL),
        battery_charge_today: be_i16(p, BATTERY_CHARGE_TODAY),
        battery_discharge_total: be_i32(p, BATTERY_DISCHARGE_TOTAL),
        battery_discharge_today: be_i16(p, BATTERY_DISCHARGE_TODAY),
        diag_status_code: be_i32(p, DIAG_STATUS_CODE),

        house_consumption: Power::from_raw(house_consumption),
    })
}

/// Reads the device clock in `tz`. Local times skipped by a DST transition
/// land one hour later; ambiguous ones take the earlier offset.
fn decode_timestamp(p: &[u8], tz: Tz) -> DateTime<FixedOffset> {
    use layout::runtime_data::{TIMESTAMP, TIMESTAMP_LEN};

    let mut raw = [0u8; TIMESTAMP_LEN];
    raw.copy_from_slice(&p[TIMESTAMP..TIMESTAMP + TIMESTAMP_LEN]);
    let local = normalize_clock(raw);

    tz.from_local_datetime(&local)
        .earliest()
        .or_else(|| tz.from_local_datetime(&(local + Duration::hours(1))).earliest())
        .unwrap_or_else(|| tz.from_utc_datetime(&local))
        .fixed_offset()
}

/// Builds a local time from the raw clock bytes, rolling out-of-range
/// components into the next unit: month 13 is January of the following
/// year and day 0 is the last day of the previous month.
fn normalize_clock([year, month, day, hour, minute, second]: [u8; 6]) -> NaiveDateTime {
    let months = i32::from(year) * 12 + i32::from(month) - 1;
    month_start(2000 + months.div_euclid(12), months.rem_euclid(12) + 1)
        .map(|start| {
            start
                + Duration::days(i64::from(day) - 1)
                + Duration::hours(i64::from(hour))
                + Duration::minutes(i64::from(minute))
                + Duration::seconds(i64::from(second))
        })
        .unwrap_or_default()
}

fn month_start(year: i32, month: i32) -> Option<NaiveDateTime> {
    NaiveDate::from_ymd_opt(year, u32::try_from(month).ok()?, 1)?.and_hms_opt(0, 0, 0)
}

fn mask_phase<T: Default>(value: T, single_phase: bool) -> T {
    if single_phase {
        T::default()
    } else {
        value
    }
}

fn ensure_len(p: &[u8], expected: usize) -> Result<(), ParserError> {
    if p.len() < expected {
        warn!(expected, actual = p.len(), "register block truncated");
        return Err(ParserError::TruncatedBuffer {
            expected,
            actual: p.len(),
        });
    }
    Ok(())
}

fn be_u16(p: &[u8], at: usize) -> u16 {
    u16::from_be_bytes([p[at], p[at + 1]])
}

fn be_i16(p: &[u8], at: usize) -> i16 {
    i16::from_be_bytes([p[at], p[at + 1]])
}

fn be_i32(p: &[u8], at: usize) -> i32 {
    i32::from_be_bytes([p[at], p[at + 1], p[at + 2], p[at + 3]])
}

fn text(p: &[u8], at: usize, len: usize) -> String {
    String::from_utf8_lossy(&p[at..at + len]).into_owned()
}
