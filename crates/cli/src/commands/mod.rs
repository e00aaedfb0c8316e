pub(crate) mod check;
pub(crate) mod fill;
pub(crate) mod generate;
pub(crate) mod mask;
