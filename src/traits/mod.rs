pub mod jet_num_traits;
pub mod jet_ops;
