/// `Temp_Humidity`
pub fn temp_humidity(temperature: f64, humidity: f64) -> f64 {
    temperature * humidity
}

/// `Occupancy_SquareFootage`
pub fn occupancy_square_footage(occupancy: i64, square_footage: i64) -> f64 {
    occupancy as f64 * square_footage as f64
}

/// `Energy_per_sqft`; needs the target, so training data only
pub fn energy_per_sqft(energy_consumption: f64, square_footage: i64) -> Option<f64> {
    (square_footage != 0).then(|| energy_consumption / square_footage as f64)
}
