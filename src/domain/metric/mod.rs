pub mod heapster;
