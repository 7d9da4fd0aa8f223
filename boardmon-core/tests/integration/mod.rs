mod pipeline_tests;
mod transport_selection_tests;
