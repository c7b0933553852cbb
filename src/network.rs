pub mod port_listener;

pub use port_listener::{
    run_listener, ListenerContext, ListenerOutcome, ListenerReport, ListenerSettings, PortListener,
};
