/// Speed of light in m.s⁻¹
pub const SPEED_OF_LIGHT_M_S: f64 = 299_792_458.0;

/// Earth angular velocity, in WGS84 frame rad/s
pub const EARTH_ANGULAR_VEL_RAD: f64 = 7.2921151467E-5;

/// Earth gravitational constant (m^3 s-2), IS-GPS-200 value
pub const EARTH_GRAVITATION_MU_M3_S2: f64 = 3.986005E14;

/// Relativistic clock correction constant F = -2√µ/c² (s.m^-1/2)
pub const RELATIVISTIC_F: f64 = -4.442807633E-10;

/// WGS84 Earth Frame Ellipsoid semi-major axis (meters)
pub const EARTH_SEMI_MAJOR_AXIS_WGS84: f64 = 6378137.0_f64;

/// WGS84 Earth Frame Ellipsoid flattening
pub const EARTH_FLATTENING_WGS84: f64 = 1.0 / 298.257223563;

/// WGS84 first eccentricity squared
pub const EARTH_ECCENTRICITY_SQ_WGS84: f64 =
    EARTH_FLATTENING_WGS84 * (2.0 - EARTH_FLATTENING_WGS84);

/// WGS84 Earth Frame Ellipsoid semi-minor axis (meters)
pub const EARTH_SEMI_MINOR_AXIS_WGS84: f64 =
    EARTH_SEMI_MAJOR_AXIS_WGS84 * (1.0 - EARTH_FLATTENING_WGS84);

/// GPS L1 carrier frequency (Hz)
pub const L1_FREQUENCY_HZ: f64 = 1575.42E6;

/// Seconds in one GPS week
pub const SECONDS_PER_WEEK: f64 = 604800.0;

/// Nanoseconds in one GPS week
pub const NANOS_PER_WEEK: u64 = 604_800_000_000_000;

/// Average signal travel time from a GPS satellite to an earth bound user (s)
pub const AVERAGE_TRAVEL_TIME_S: f64 = 70.0E-3;

/// Smallest number of satellites that defines a position and clock solution
pub const MIN_SATELLITES: usize = 4;
