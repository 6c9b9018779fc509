pub fn shadow_update(device: &str) -> String {
    format!("devices/{device}/shadow/update")
}

pub fn shadow_delta(device: &str) -> String {
    format!("devices/{device}/shadow/update/delta")
}

pub fn telemetry(device: &str) -> String {
    format!("devices/{device}/telemetry")
}
