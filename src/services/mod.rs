pub(crate) mod backend;
