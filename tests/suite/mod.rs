mod cli;
mod lifecycle;
