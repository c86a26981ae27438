//! Byte offsets of the ET-series register blocks. All fields are big-endian.

pub mod device_info {
    pub const MODBUS_VERSION: usize = 0;
    pub const RATED_POWER: usize = 2;
    pub const AC_OUTPUT_TYPE: usize = 4;
    pub const SERIAL_NUMBER: usize = 6;
    pub const SERIAL_NUMBER_LEN: usize = 16;
    pub const MODEL_NAME: usize = 22;
    pub const MODEL_NAME_LEN: usize = 10;
    pub const DSP1_SW_VERSION: usize = 32;
    pub const DSP2_SW_VERSION: usize = 34;
    pub const DSP_SVN_VERSION: usize = 36;
    pub const ARM_SW_VERSION: usize = 38;
    pub const ARM_SVN_VERSION: usize = 40;
    pub const SOFTWARE_VERSION: usize = 42;
    pub const SOFTWARE_VERSION_LEN: usize = 12;
    pub const ARM_VERSION: usize = 54;
    pub const ARM_VERSION_LEN: usize = 12;

    pub const LEN: usize = 66;
}

pub mod runtime_data {
    /// Year offset from 2000, month, day, hour, minute, second.
    pub const TIMESTAMP: usize = 0;
    pub const TIMESTAMP_LEN: usize = 6;

    pub const PV1_VOLTAGE: usize = 6;
    pub const PV1_CURRENT: usize = 8;
    pub const PV1_POWER: usize = 10;
    pub const PV2_VOLTAGE: usize = 14;
    pub const PV2_CURRENT: usize = 16;
    pub const PV2_POWER: usize = 18;
    // 22..40 reserved
    pub const PV2_MODE: usize = 40;
    pub const PV1_MODE: usize = 41;

    pub const ON_GRID_L1_VOLTAGE: usize = 42;
    pub const ON_GRID_L1_CURRENT: usize = 44;
    pub const ON_GRID_L1_FREQUENCY: usize = 46;
    pub const ON_GRID_L1_POWER: usize = 48;
    pub const ON_GRID_L2_VOLTAGE: usize = 52;
    pub const ON_GRID_L2_CURRENT: usize = 54;
    pub const ON_GRID_L2_FREQUENCY: usize = 56;
    pub const ON_GRID_L2_POWER: usize = 58;
    pub const ON_GRID_L3_VOLTAGE: usize = 62;
    pub const ON_GRID_L3_CURRENT: usize = 64;
    pub const ON_GRID_L3_FREQUENCY: usize = 66;
    pub const ON_GRID_L3_POWER: usize = 68;
    pub const GRID_MODE: usize = 72;
    pub const TOTAL_INVERTER_POWER: usize = 74;
    pub const ACTIVE_POWER: usize = 78;
    pub const REACTIVE_POWER: usize = 82;
    pub const APPARENT_POWER: usize = 86;

    pub const BACKUP_L1_VOLTAGE: usize = 90;
    pub const BACKUP_L1_CURRENT: usize = 92;
    pub const BACKUP_L1_FREQUENCY: usize = 94;
    pub const LOAD_MODE_L1: usize = 96;
    pub const BACKUP_L1_POWER: usize = 98;
    pub const BACKUP_L2_VOLTAGE: usize = 102;
    pub const BACKUP_L2_CURRENT: usize = 104;
    pub const BACKUP_L2_FREQUENCY: usize = 106;
    pub const LOAD_MODE_L2: usize = 108;
    pub const BACKUP_L2_POWER: usize = 110;
    pub const BACKUP_L3_VOLTAGE: usize = 114;
    pub const BACKUP_L3_CURRENT: usize = 116;
    pub const BACKUP_L3_FREQUENCY: usize = 118;
    pub const LOAD_MODE_L3: usize = 120;
    pub const BACKUP_L3_POWER: usize = 122;

    pub const LOAD_L1: usize = 126;
    pub const LOAD_L2: usize = 130;
    pub const LOAD_L3: usize = 134;
    pub const BACKUP_LOAD: usize = 138;
    pub const LOAD: usize = 142;
    pub const UPS_LOAD: usize = 146;

    pub const TEMPERATURE_AIR: usize = 148;
    pub const TEMPERATURE_MODULE: usize = 150;
    pub const TEMPERATURE: usize = 152;
    pub const FUNCTION_BIT: usize = 154;
    pub const BUS_VOLTAGE: usize = 156;
    pub const NBUS_VOLTAGE: usize = 158;
    pub const BATTERY_VOLTAGE: usize = 160;
    pub const BATTERY_CURRENT: usize = 162;
    // 164..166 reserved
    pub const BATTERY_MODE: usize = 166;
    pub const WARNING_CODE: usize = 170;
    pub const SAFETY_COUNTRY_CODE: usize = 172;
    pub const WORK_MODE: usize = 174;
    pub const OPERATION_CODE: usize = 178;
    pub const ERROR_CODES: usize = 180;

    pub const ENERGY_GENERATION_TOTAL: usize = 182;
    pub const ENERGY_GENERATION_TODAY: usize = 186;
    pub const ENERGY_EXPORT_TOTAL: usize = 190;
    pub const ENERGY_EXPORT_TOTAL_HOURS: usize = 194;
    pub const ENERGY_EXPORT_TODAY: usize = 198;
    pub const ENERGY_IMPORT_TOTAL: usize = 200;
    pub const ENERGY_IMPORT_TODAY: usize = 204;
    pub const ENERGY_LOAD_TOTAL: usize = 206;
    pub const ENERGY_LOAD_DAY: usize = 210;
    pub const BATTERY_CHARGE_TOTAL: usize = 212;
    pub const BATTERY_CHARGE_TODAY: usize = 216;
    pub const BATTERY_DISCHARGE_TOTAL: usize = 218;
    pub const BATTERY_DISCHARGE_TODAY: usize = 222;
    // 224..240 reserved
    pub const DIAG_STATUS_CODE: usize = 240;

    pub const LEN: usize = 244;
}
