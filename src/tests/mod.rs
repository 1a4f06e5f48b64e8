// Cross-module scenarios driving the full engine block by block

mod integration;
