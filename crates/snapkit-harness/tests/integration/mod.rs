mod baselines_on_disk;
mod delete_block_in_inlines;
