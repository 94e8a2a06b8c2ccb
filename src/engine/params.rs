/// Engine configuration. `price_scale`/`qty_scale` come from the snapshot
/// header, not from this struct — see `SPEC_FULL.md` §3.1.
#[derive(Debug, Clone, Copy)]
pub struct SimulatorParams {
    pub max_orders: u64,
    pub max_events: u64,
    pub alpha_ppm: i64,
    pub maker_fee_ppm: i64,
    pub taker_fee_ppm: i64,
    pub outbound_latency_ns: i64,
    pub observation_latency_ns: i64,
}

impl Default for SimulatorParams {
    fn default() -> Self {
        SimulatorParams {
            max_orders: 1_000_000,
            max_events: 4_000_000,
            alpha_ppm: 0,
            maker_fee_ppm: 0,
            taker_fee_ppm: 0,
            outbound_latency_ns: 0,
            observation_latency_ns: 0,
        }
    }
}
