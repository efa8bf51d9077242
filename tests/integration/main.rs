mod equivalence_test;
mod pipeline_test;
