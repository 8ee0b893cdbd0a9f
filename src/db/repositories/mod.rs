mod observations;
mod traffic_lights;
