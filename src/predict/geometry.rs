use super::ground_point::{GroundPoint, EARTH_ECCENTRICITY_SQ, EARTH_EQUATORIAL_RADIUS_KM};
use super::{LookAngles, SubSatellitePoint};

const GEODETIC_TOLERANCE_RAD: f64 = 1e-10;
const GEODETIC_MAX_ITERATIONS: usize = 10;

pub fn teme_to_ecef_position(pos_teme: [f64; 3], gmst: f64) -> [f64; 3] {
    let cos_gmst = gmst.cos();
    let sin_gmst = gmst.sin();
    [
        pos_teme[0] * cos_gmst + pos_teme[1] * sin_gmst,
        -pos_teme[0] * sin_gmst + pos_teme[1] * cos_gmst,
        pos_teme[2],
    ]
}

pub fn ecef_to_enu(dr: [f64; 3], lat_rad: f64, lon_rad: f64) -> (f64, f64, f64) {
    let sin_lat = lat_rad.sin();
    let cos_lat = lat_rad.cos();
    let sin_lon = lon_rad.sin();
    let cos_lon = lon_rad.cos();

    let east = -sin_lon * dr[0] + cos_lon * dr[1];
    let north = -sin_lat * cos_lon * dr[0] - sin_lat * sin_lon * dr[1] + cos_lat * dr[2];
    let up = cos_lat * cos_lon * dr[0] + cos_lat * sin_lon * dr[1] + sin_lat * dr[2];
    (east, north, up)
}

/// Iterative WGS-84 conversion of an ECEF position (km).
pub fn ecef_to_geodetic(pos: [f64; 3]) -> SubSatellitePoint {
    let r = (pos[0] * pos[0] + pos[1] * pos[1]).sqrt();
    let lon = pos[1].atan2(pos[0]);
    let mut lat = pos[2].atan2(r);
    let mut c = 1.0;

    for _ in 0..GEODETIC_MAX_ITERATIONS {
        let phi = lat;
        let sin_phi = phi.sin();
        c = 1.0 / (1.0 - EARTH_ECCENTRICITY_SQ * sin_phi * sin_phi).sqrt();
        lat = (pos[2] + EARTH_EQUATORIAL_RADIUS_KM * c * EARTH_ECCENTRICITY_SQ * sin_phi).atan2(r);
        if (lat - phi).abs() < GEODETIC_TOLERANCE_RAD {
            break;
        }
    }

    let altitude_km = if lat.cos().abs() > 1e-12 {
        r / lat.cos() - EARTH_EQUATORIAL_RADIUS_KM * c
    } else {
        // Over a pole.
        pos[2].abs() - EARTH_EQUATORIAL_RADIUS_KM * c * (1.0 - EARTH_ECCENTRICITY_SQ)
    };

    SubSatellitePoint {
        longitude_deg: lon.to_degrees(),
        latitude_deg: lat.to_degrees(),
        altitude_km,
    }
}

/// Azimuth/elevation of an ECEF satellite position seen from `ground`.
pub fn look_angles(sat_ecef: [f64; 3], ground: &GroundPoint) -> LookAngles {
    let sta = ground.position_ecef_km();
    let dr = [
        sat_ecef[0] - sta[0],
        sat_ecef[1] - sta[1],
        sat_ecef[2] - sta[2],
    ];
    let range_km = (dr[0] * dr[0] + dr[1] * dr[1] + dr[2] * dr[2]).sqrt();

    let enu = ecef_to_enu(dr, ground.lat_rad(), ground.lon_rad());
    let azimuth = enu.0.atan2(enu.1).to_degrees().rem_euclid(360.0);
    let elevation = if range_km > 0.0 {
        (enu.2 / range_km).asin().to_degrees()
    } else {
        0.0
    };

    LookAngles {
        azimuth_deg: azimuth,
        elevation_deg: elevation,
    }
}
