pub mod decay;
pub mod gossip;
