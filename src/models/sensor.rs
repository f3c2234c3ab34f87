use indexmap::IndexMap;

/// One hardware sensor node discovered under the `dev.gpioths` tree.
///
/// Built once by the discovery scan and never mutated afterwards. The
/// `properties` map holds every leaf the driver exposes for this index;
/// a missing key means the driver does not support that property.
#[derive(Debug, Clone)]
pub struct SensorDescriptor {
    pub index: u32,
    pub driver: String,
    pub desc: String,
    pub properties: IndexMap<String, String>,
}

impl SensorDescriptor {
    pub fn new(index: u32) -> Self {
        Self {
            index,
            driver: String::new(),
            desc: String::new(),
            properties: IndexMap::new(),
        }
    }
}
