mod controller;
mod generation;
