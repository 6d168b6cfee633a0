/// The common set of capacities and scheduling knobs for a simulation.
#[derive(Debug, Clone, Copy)]
pub struct SimulationSettings {
    /// The number of bodies to allocate space for.
    pub body_capacity: usize,
    /// The number of shape core snapshots to allocate space for.
    pub shape_core_capacity: usize,
    /// The number of broad phase slots to allocate space for.
    pub broad_phase_capacity: usize,
    /// Maximum number of live narrow phase collision volumes.
    /// Creation requests beyond this report pool exhaustion.
    pub volume_pool_capacity: usize,
    /// Number of worker threads used for the broad phase preparation fan out.
    /// 1 runs the phase on the calling thread.
    pub worker_count: usize,
}

impl SimulationSettings {
    /// Constructs a settings description with the given capacities.
    pub fn new(
        body_capacity: usize,
        shape_core_capacity: usize,
        broad_phase_capacity: usize,
        volume_pool_capacity: usize,
        worker_count: usize,
    ) -> Self {
        Self {
            body_capacity,
            shape_core_capacity,
            broad_phase_capacity,
            volume_pool_capacity,
            worker_count,
        }
    }
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self {
            body_capacity: 64,
            shape_core_capacity: 128,
            broad_phase_capacity: 256,
            volume_pool_capacity: 256,
            worker_count: 1,
        }
    }
}
